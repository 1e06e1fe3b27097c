//! The interfaces that a binding implements to describe its heap to the compactor.
//!
//! A binding defines a zero-sized type implementing [`VMBinding`], whose associated types name
//! the implementation of every collaborator below. Every method is static: the compactor never
//! holds an instance of any of them.

mod chunks;
mod filler;
mod object_model;
mod reference_glue;
mod scanning;
pub mod slot;
mod vmbinding;

pub use self::chunks::BrickTable;
pub use self::chunks::Chunk;
pub use self::chunks::ChunkModel;
pub use self::chunks::FirstObjectTable;
pub use self::filler::Filler;
pub use self::object_model::ObjectModel;
pub use self::reference_glue::ReferenceGlue;
pub use self::scanning::Scanning;
pub use self::scanning::SlotVisitor;
pub use self::vmbinding::VMBinding;

use super::record::RecordLayout;
use crate::util::Address;
use crate::vm::*;

/// Return the address that `ptr` will have after compaction, or `None` if it does not point
/// into a live sequence of `chunk`. `ptr` may point anywhere inside an object.
///
/// Only valid between planning and compaction, while the relocation records and the brick
/// table of `chunk` are intact.
pub fn new_address<VM: VMBinding>(chunk: Chunk, ptr: Address) -> Option<Address> {
    if ptr >= VM::VMChunkModel::top(chunk) || ptr < VM::VMChunkModel::objects_start(chunk) {
        return None;
    }

    let brick = VM::VMBrickTable::index(chunk, ptr);
    let mut sequence = VM::VMBrickTable::get(chunk, brick);
    if sequence > ptr {
        // A dead gap that spans to the start of the next brick.
        return None;
    }

    // The walk is bounded by the number of sequences starting in one brick.
    while let Some(next) = VM::VMRecordLayout::next_sequence(sequence) {
        if next > ptr {
            break;
        }
        sequence = next;
    }

    if ptr >= sequence + VM::VMRecordLayout::size(sequence) {
        return None;
    }
    Some(VM::VMRecordLayout::destination(sequence) + (ptr - sequence))
}

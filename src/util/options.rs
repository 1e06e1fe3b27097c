use crate::util::constants::DEFAULT_RELOCATION_STACK_SEGMENT_BYTES;
use crate::util::conversions;
use crate::util::log;
use std::default::Default;

fn always_valid<T>(_: &T) -> bool {
    true
}

/// Options prefixed with this string can be set from environment variables, e.g.
/// `CHUNK_COMPACTOR_THREADS=4`.
pub const ENV_VAR_PREFIX: &str = "CHUNK_COMPACTOR_";

macro_rules! options {
    ($($(#[$outer:meta])* $name:ident: $type:ty[$validator:expr] = $default:expr),*,) => [
        options!($($(#[$outer])* $name: $type[$validator] = $default),*);
    ];
    ($($(#[$outer:meta])* $name:ident: $type:ty[$validator:expr] = $default:expr),*) => [
        /// Tunables of the compactor.
        #[derive(Clone, Debug)]
        pub struct Options {
            $($(#[$outer])* pub $name: $type),*
        }
        impl Options {
            /// Options with all default values, ignoring environment variables.
            pub fn with_defaults() -> Self {
                Options {
                    $($name: $default),*
                }
            }

            /// Set an option by its snake-case name. The value is parsed to the option's type and
            /// validated; on failure the option keeps its current value. Returns an error
            /// describing the problem if the option is unknown or the value is rejected.
            pub fn set_from_str(&mut self, s: &str, val: &str) -> Result<(), String> {
                match s {
                    $(stringify!($name) => {
                        let parsed = val.parse::<$type>().map_err(|_| {
                            format!("unable to set {}={:?}: can't parse value", s, val)
                        })?;
                        let validate_fn = $validator;
                        if validate_fn(&parsed) {
                            self.$name = parsed;
                            Ok(())
                        } else {
                            Err(format!("unable to set {}={:?}: invalid value", s, val))
                        }
                    })*
                    _ => Err(format!("invalid option key: {}", s)),
                }
            }

            /// Check every option against its validator.
            pub fn validate(&self) -> Result<(), String> {
                $(
                    let validate_fn = $validator;
                    if !validate_fn(&self.$name) {
                        return Err(format!("invalid value for {}: {:?}", stringify!($name), self.$name));
                    }
                )*
                Ok(())
            }

            /// Override options from `CHUNK_COMPACTOR_<NAME>` environment variables. Invalid values
            /// are reported and ignored.
            pub fn read_env_var_settings(&mut self) {
                for (key, val) in std::env::vars() {
                    if let Some(rest_of_key) = key.strip_prefix(ENV_VAR_PREFIX) {
                        let lowercase: &str = &rest_of_key.to_lowercase();
                        match lowercase {
                            $(stringify!($name) => {
                                if let Err(e) = self.set_from_str(lowercase, &val) {
                                    log::warn!("{}. Default value will be used.", e);
                                }
                            },)*
                            _ => {}
                        }
                    }
                }
            }
        }
        impl Default for Options {
            /// Default values, overridden by any matching environment variables.
            fn default() -> Self {
                let mut options = Self::with_defaults();
                options.read_env_var_settings();
                options
            }
        }
    ]
}

options! {
    /// Number of worker threads for the parallel phases (fixup and sweeping).
    threads:                        usize [|v: &usize| *v > 0] = num_cpus::get(),
    /// Bytes in one segment of a relocation stack. Must be a positive multiple of the page size.
    relocation_stack_segment_size:  usize [|v: &usize| *v > 0 && conversions::raw_is_aligned(*v, crate::util::constants::BYTES_IN_PAGE)] = DEFAULT_RELOCATION_STACK_SEGMENT_BYTES,
    /// Clear the space a compacted chunk gave up after compaction.
    zap_reclaimed_space:            bool  [always_valid] = false,
}

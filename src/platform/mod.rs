// EnvStation — Platform Bindings
//
// Implementations of the pipeline's hardware traits.  Only built for
// ESP-IDF; everything above this layer also builds and tests on the host.

#[cfg(target_os = "espidf")]
pub mod esp;

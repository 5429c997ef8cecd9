//! Small helpers shared by the sithres crates

mod result_ext;
pub use result_ext::AnyhowResultExt;

pub type AnyResult<T = (), E = anyhow::Error> = anyhow::Result<T, E>;

/// Shorthand for `Ok(())`, which gets noisy at the end of every function
pub const fn ok<E>() -> Result<(), E> {
    Ok(())
}

//! Miscellaneous output helpers.

use std::{ fs, path::Path };
use ndarray_npy::NpzWriter;
use crate::error::EitResult;

/// Create a directory and all its parents if it doesn't already exist.
///
/// Expands to an expression of type [`EitResult<()>`][crate::EitResult].
#[macro_export]
macro_rules! mkdir {
    ( $path:expr ) => {
        $crate::utils::create_dir(&$path)
    }
}

/// Write a collection of named arrays to an uncompressed `.npz` archive.
///
/// ```ignore
/// write_npz!(
///     outdir.join("scan.npz"),
///     arrays: {
///         "det" => &det,
///         "chi3" => &chi3,
///     }
/// )?;
/// ```
/// Expands to an expression of type [`EitResult<()>`][crate::EitResult].
#[macro_export]
macro_rules! write_npz {
    (
        $filename:expr,
        arrays: { $( $key:literal => $arr:expr ),* $(,)? } $(,)?
    ) => {
        (|| -> $crate::EitResult<()> {
            let mut _npz_ = $crate::utils::npz_writer(&$filename)?;
            $(
                _npz_.add_array($key, $arr)?;
            )*
            _npz_.finish()?;
            Ok(())
        })()
    }
}

/// Create a directory and all its parents if it doesn't already exist.
pub fn create_dir<P>(path: P) -> EitResult<()>
where P: AsRef<Path>
{
    let path = path.as_ref();
    if !path.is_dir() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Create the parent directory of a file path if needed.
pub fn create_parent<P>(path: P) -> EitResult<()>
where P: AsRef<Path>
{
    match path.as_ref().parent() {
        Some(parent) if !parent.as_os_str().is_empty() => create_dir(parent),
        _ => Ok(()),
    }
}

/// Open a new `.npz` archive for writing, creating parent directories as
/// needed.
pub fn npz_writer<P>(path: P) -> EitResult<NpzWriter<fs::File>>
where P: AsRef<Path>
{
    create_parent(&path)?;
    let file = fs::File::create(path)?;
    Ok(NpzWriter::new(file))
}

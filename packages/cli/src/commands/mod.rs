pub mod diff;
pub mod index;
pub mod init;
pub mod resolve;

pub use diff::{diff, DiffArgs};
pub use index::{index, IndexArgs};
pub use init::{init, InitArgs};
pub use resolve::{block, resolve, BlockArgs, ResolveArgs};

use std::path::{Path, PathBuf};

/// `path` relative to `cwd` unless absolute
fn project_root(cwd: &str, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        Path::new(cwd).join(path)
    }
}

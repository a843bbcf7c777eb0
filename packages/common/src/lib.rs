pub mod diff;
pub mod dom;
pub mod error;
pub mod filesystem;
pub mod result;
pub mod style;
pub mod template;

pub use diff::*;
pub use dom::*;
pub use error::*;
pub use filesystem::*;
pub use result::*;
pub use style::*;
pub use template::*;

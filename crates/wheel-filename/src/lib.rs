pub use tags::SupportedTags;
pub use wheel_filename::{WheelFilename, WheelFilenameError};

mod tags;
mod wheel_filename;

pub mod dispatch;
pub mod doc;
pub mod files;
pub mod latest;
pub mod progress;
pub mod rbs;
pub mod readme;
pub mod shared;
pub mod show;
pub mod versions;

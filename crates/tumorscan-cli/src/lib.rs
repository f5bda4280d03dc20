pub mod predict;
pub mod report;
pub mod train;
pub mod util;

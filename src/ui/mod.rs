pub mod icons;
pub mod output;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{error, header, human_bytes, section, status, success, summary_row, warn};
pub use table::{TableBuilder, usage_table};
pub use theme::{Theme, theme};

//! credvault 落盘格式。

pub mod line;

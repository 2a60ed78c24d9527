//! 与用户空间共用定义和声明
//!
//! 包含常量、类型和函数声明，确保 VFS 层和应用程序/Shell 之间的一致性

#![no_std]
#![allow(dead_code)]
// uapi 中包含大量与 POSIX 兼容的常量/结构体字段定义；逐项补 `///` 噪声较大。
#![allow(missing_docs)]

pub mod errno;
pub mod fcntl;
pub mod fs;
pub mod poll;
pub mod select;
pub mod time;

//! 路径规范化与挂载点相对路径
//!
//! VFS 内部只处理规范化后的绝对路径：
//!
//! - 以 `/` 开头，组件之间只有一个 `/`，除根目录外不以 `/` 结尾
//! - `.` 被跳过，`..` 弹出上一个组件，不能越过根目录
//! - 相对路径先拼接到当前工作目录之后再规范化

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use crate::FsError;
use crate::config::MAX_PATH_LEN;

/// 路径组件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathComponent {
    /// 根目录 "/"
    Root,
    /// 当前目录 "."
    Current,
    /// 父目录 ".."
    Parent,
    /// 正常的文件名
    Normal(String),
}

/// 将路径字符串解析为组件列表
pub fn parse_path(path: &str) -> Vec<PathComponent> {
    let mut components = Vec::new();

    if path.starts_with('/') {
        components.push(PathComponent::Root);
    }

    for part in path.split('/').filter(|s| !s.is_empty()) {
        let component = match part {
            "." => PathComponent::Current,
            ".." => PathComponent::Parent,
            name => PathComponent::Normal(String::from(name)),
        };
        components.push(component);
    }

    components
}

/// 规范化路径（处理 ".." 和 "."）
pub fn normalize_path(path: &str) -> String {
    let components = parse_path(path);
    let mut stack: Vec<String> = Vec::new();
    let mut is_absolute = false;

    for component in components {
        match component {
            PathComponent::Root => {
                is_absolute = true;
            }
            PathComponent::Current => {}
            PathComponent::Parent => {
                if is_absolute {
                    // 绝对路径：不能越过根目录
                    stack.pop();
                } else if let Some(last) = stack.last() {
                    if last == ".." {
                        stack.push(String::from(".."));
                    } else {
                        stack.pop();
                    }
                } else {
                    stack.push(String::from(".."));
                }
            }
            PathComponent::Normal(name) => {
                stack.push(name);
            }
        }
    }

    if stack.is_empty() {
        if is_absolute {
            String::from("/")
        } else {
            String::from(".")
        }
    } else if is_absolute {
        String::from("/") + &stack.join("/")
    } else {
        stack.join("/")
    }
}

/// 以 `cwd` 为基准构造规范化的绝对路径
///
/// - 空路径返回 [`FsError::InvalidArgument`]
/// - 结果超过 [`MAX_PATH_LEN`] 返回 [`FsError::NameTooLong`]
pub fn absolute_path(cwd: &str, path: &str) -> Result<String, FsError> {
    if path.is_empty() {
        return Err(FsError::InvalidArgument);
    }

    let abs = if path.starts_with('/') {
        normalize_path(path)
    } else {
        normalize_path(&format!("{}/{}", cwd, path))
    };

    if abs.len() > MAX_PATH_LEN {
        return Err(FsError::NameTooLong);
    }
    Ok(abs)
}

/// 判断挂载路径 `mount` 是否覆盖绝对路径 `path`
///
/// 只在组件边界上匹配：`/data` 覆盖 `/data` 和 `/data/x`，不覆盖 `/data2`。
pub fn mount_covers(mount: &str, path: &str) -> bool {
    if mount == "/" {
        return path.starts_with('/');
    }
    match path.strip_prefix(mount) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// 计算 `path` 相对于挂载路径的后端路径
///
/// 结果总以 `/` 开头，挂载点本身对应 `/`。调用方需保证 [`mount_covers`] 成立。
pub fn relative_to_mount<'a>(mount: &str, path: &'a str) -> &'a str {
    if mount == "/" {
        return path;
    }
    match path.get(mount.len()..) {
        Some(rest) if !rest.is_empty() => rest,
        _ => "/",
    }
}

/// 把挂载路径和后端相对路径拼回绝对路径
pub fn join_mount_path(mount: &str, relative: &str) -> String {
    normalize_path(&format!("{}/{}", mount, relative))
}

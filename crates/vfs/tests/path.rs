use vfs::{
    FsError, PathComponent, absolute_path, join_mount_path, mount_covers, normalize_path,
    parse_path, relative_to_mount,
};

#[test]
fn test_normalize_path_absolute() {
    assert_eq!(normalize_path("/foo/bar"), "/foo/bar");
    assert_eq!(normalize_path("/"), "/");
    assert_eq!(normalize_path("///foo///bar///"), "/foo/bar");
}

#[test]
fn test_normalize_path_current() {
    assert_eq!(normalize_path("/foo/./bar"), "/foo/bar");
    assert_eq!(normalize_path("./foo"), "foo");
    assert_eq!(normalize_path("."), ".");
}

#[test]
fn test_normalize_path_parent() {
    assert_eq!(normalize_path("/foo/bar/.."), "/foo");
    assert_eq!(normalize_path("/foo/../bar"), "/bar");
    assert_eq!(normalize_path("/.."), "/");
    assert_eq!(normalize_path("/../.."), "/");
}

#[test]
fn test_normalize_path_relative() {
    assert_eq!(normalize_path("foo/bar"), "foo/bar");
    assert_eq!(normalize_path("foo/../bar"), "bar");
    assert_eq!(normalize_path("../foo"), "../foo");
    assert_eq!(normalize_path("../../foo"), "../../foo");
}

#[test]
fn test_normalize_path_empty() {
    assert_eq!(normalize_path(""), ".");
}

#[test]
fn test_normalize_path_complex() {
    assert_eq!(normalize_path("/foo/./bar/../baz/./qux/.."), "/foo/baz");
    assert_eq!(normalize_path("foo/bar/../../baz"), "baz");
}

#[test]
fn test_parse_path_components() {
    let components = parse_path("/foo/bar");
    assert_eq!(components.len(), 3);
    assert_eq!(components[0], PathComponent::Root);
    assert_eq!(components[1], PathComponent::Normal("foo".to_string()));
    assert_eq!(components[2], PathComponent::Normal("bar".to_string()));

    let components = parse_path("foo/./bar/../baz");
    assert_eq!(components.len(), 5);
    assert_eq!(components[0], PathComponent::Normal("foo".to_string()));
    assert_eq!(components[1], PathComponent::Current);
    assert_eq!(components[2], PathComponent::Normal("bar".to_string()));
    assert_eq!(components[3], PathComponent::Parent);
    assert_eq!(components[4], PathComponent::Normal("baz".to_string()));
}

#[test]
fn test_normalize_path_root_parent() {
    assert_eq!(normalize_path("/foo/.."), "/");
    assert_eq!(normalize_path("/foo/bar/../.."), "/");
}


#[test]
fn test_absolute_path_joins_cwd() {
    assert_eq!(absolute_path("/", "foo").unwrap(), "/foo");
    assert_eq!(absolute_path("/data", "a/../b.txt").unwrap(), "/data/b.txt");
    assert_eq!(absolute_path("/data", "/etc//x/").unwrap(), "/etc/x");
    assert_eq!(absolute_path("/data", "..").unwrap(), "/");
}

#[test]
fn test_absolute_path_rejects_empty_and_long() {
    assert_eq!(absolute_path("/", ""), Err(FsError::InvalidArgument));
    let long = "/".to_string() + &"a".repeat(300);
    assert_eq!(absolute_path("/", &long), Err(FsError::NameTooLong));
}

#[test]
fn test_mount_covers_component_boundary() {
    assert!(mount_covers("/", "/anything"));
    assert!(mount_covers("/data", "/data"));
    assert!(mount_covers("/data", "/data/a.txt"));
    assert!(!mount_covers("/data", "/data2"));
    assert!(!mount_covers("/data", "/dat"));
}

#[test]
fn test_relative_to_mount() {
    assert_eq!(relative_to_mount("/", "/a/b"), "/a/b");
    assert_eq!(relative_to_mount("/data", "/data/a.txt"), "/a.txt");
    assert_eq!(relative_to_mount("/data", "/data"), "/");
}

#[test]
fn test_join_mount_path() {
    assert_eq!(join_mount_path("/", "/a.txt"), "/a.txt");
    assert_eq!(join_mount_path("/data", "/a.txt"), "/data/a.txt");
    assert_eq!(join_mount_path("/data", "/"), "/data");
}

use std::path::Path;

fn manifest(path: &Path) -> toml::Value {
    let text = std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("failed to read {}: {e}", path.display()));
    toml::from_str(&text).unwrap_or_else(|e| panic!("failed to parse {}: {e}", path.display()))
}

fn clippy_level<'a>(table: &'a toml::Value, path: &[&str], lint: &str) -> Option<&'a str> {
    let mut current = table;
    for key in path {
        current = current.get(key)?;
    }
    current.get(lint)?.as_str()
}

#[test]
fn workspace_denies_unwrap_used() {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    let workspace_dir = match manifest_dir.parent().and_then(Path::parent) {
        Some(dir) => dir,
        None => panic!("workspace root should be two levels above package manifest dir"),
    };
    let workspace = manifest(&workspace_dir.join("Cargo.toml"));

    assert_eq!(
        clippy_level(&workspace, &["workspace", "lints", "clippy"], "unwrap_used"),
        Some("deny")
    );
    assert_eq!(
        clippy_level(&workspace, &["workspace", "lints", "clippy"], "expect_used"),
        Some("warn")
    );
}

#[test]
fn package_keeps_expect_used_as_warning() {
    let package = manifest(&Path::new(env!("CARGO_MANIFEST_DIR")).join("Cargo.toml"));
    assert_eq!(
        clippy_level(&package, &["lints", "clippy"], "expect_used"),
        Some("warn")
    );
    assert_eq!(
        clippy_level(&package, &["lints", "clippy"], "unwrap_used"),
        Some("warn")
    );
}

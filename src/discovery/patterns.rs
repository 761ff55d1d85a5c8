//! Path classification used by discovery: skip lists, sensitive names,
//! dependency manifests, and the extension-to-language map.

/// Directories never descended into during traversal.
pub const SKIP_DIRS: &[&str] = &[
    "node_modules",
    ".git",
    "dist",
    "build",
    "__pycache__",
    ".next",
    ".vscode",
    "coverage",
    "tmp",
    "temp",
    "vendor",
    "target",
    "third_party",
    "external",
    "deps",
];

/// Dependency manifests and lockfiles. These are parsed for advisory lookups
/// and scanned for secrets, but skipped by static analysis.
pub const DEPENDENCY_MANIFESTS: &[&str] = &[
    "package.json",
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "requirements.txt",
    "Pipfile",
    "Pipfile.lock",
    "Gemfile",
    "Gemfile.lock",
    "go.mod",
    "go.sum",
    "pom.xml",
    "build.gradle",
    "composer.json",
    "composer.lock",
    "Cargo.toml",
    "Cargo.lock",
];

/// Filename substrings that mark a unit as sensitive by name alone,
/// regardless of content.
const SENSITIVE_SUBSTRINGS: &[&str] = &[
    ".env",
    "credential",
    "secret",
    "password",
    "id_rsa",
    "id_dsa",
    "backup",
    ".htpasswd",
];

/// Extensions whose files are sensitive by name (key material, dumps).
const SENSITIVE_EXTENSIONS: &[&str] = &["pem", "key", "p12", "pfx", "sql", "keystore", "jks"];

pub fn is_skippable_dir(name: &str) -> bool {
    SKIP_DIRS.contains(&name)
}

pub fn is_dependency_manifest(path: &str) -> bool {
    let name = file_name(path);
    DEPENDENCY_MANIFESTS.contains(&name)
}

pub fn is_sensitive_name(path: &str) -> bool {
    let name = file_name(path).to_ascii_lowercase();
    if SENSITIVE_SUBSTRINGS.iter().any(|s| name.contains(s)) {
        return true;
    }
    match name.rsplit_once('.') {
        Some((stem, ext)) => !stem.is_empty() && SENSITIVE_EXTENSIONS.contains(&ext),
        None => false,
    }
}

/// Language hint for a file extension, used to pick static-analysis rulesets.
pub fn language_for_extension(ext: &str) -> Option<&'static str> {
    let language = match ext {
        "js" | "jsx" | "mjs" | "cjs" => "javascript",
        "ts" | "tsx" => "typescript",
        "py" => "python",
        "rb" => "ruby",
        "go" => "go",
        "java" => "java",
        "php" => "php",
        "c" | "h" | "cpp" | "cc" | "hpp" => "c",
        "cs" => "csharp",
        "rs" => "rust",
        "kt" | "kts" => "kotlin",
        "sh" | "bash" => "bash",
        "yml" | "yaml" => "yaml",
        "json" => "json",
        "tf" => "terraform",
        _ => return None,
    };
    Some(language)
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

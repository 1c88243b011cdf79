use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

const ENV_KEYS: [&str; 14] = [
    "OPENAI_API_KEY",
    "EMBED_MODEL",
    "OPENAI_BASE_URL",
    "EMBED_DIM",
    "QDRANT_URL",
    "QDRANT_COLLECTION",
    "QDRANT_API_KEY",
    "KB_DIR",
    "LLM_PROVIDER",
    "GOOGLE_API_KEY",
    "OPENAI_MODEL",
    "GEMINI_MODEL",
    "OLLAMA_MODEL",
    "OLLAMA_URL",
];

fn dpk_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_dpk"))
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let kb = root.join("kb");
    fs::create_dir_all(kb.join("inbound")).unwrap();
    fs::write(kb.join("a.md"), "cat dog").unwrap();
    fs::write(kb.join("b.md"), "cat cat cat").unwrap();
    fs::write(kb.join("inbound/c.txt"), "bird").unwrap();
    fs::write(kb.join("ignored.png"), "cat cat cat cat").unwrap();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    let config_path = config_dir.join("dpk.toml");
    fs::write(
        &config_path,
        format!(
            "[knowledge_base]\ndir = \"{}\"\n\n[embedding]\ndims = 64\n",
            kb.display()
        ),
    )
    .unwrap();

    (tmp, config_path)
}

fn run_dpk_with_env(
    config_path: &Path,
    args: &[&str],
    env: &[(&str, &str)],
) -> (String, String, bool) {
    let binary = dpk_binary();
    let mut cmd = Command::new(&binary);
    for key in ENV_KEYS {
        cmd.env_remove(key);
    }
    cmd.env_remove("RUST_LOG");
    for (k, v) in env {
        cmd.env(k, v);
    }
    let output = cmd
        .arg("--config")
        .arg(config_path)
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run dpk binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

fn run_dpk(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    run_dpk_with_env(config_path, args, &[])
}

#[test]
fn test_context_local_ranking() {
    let (_tmp, config) = setup_test_env();
    let (stdout, stderr, ok) = run_dpk(&config, &["context", "cat", "-k", "2"]);
    assert!(ok, "context failed: {}", stderr);
    assert_eq!(
        stdout,
        "### b.md (score=1.000)\ncat cat cat\n\n### a.md (score=0.707)\ncat dog\n"
    );
}

#[test]
fn test_search_local_lists_all_kb_files() {
    let (_tmp, config) = setup_test_env();
    let (stdout, stderr, ok) = run_dpk(&config, &["search", "cat"]);
    assert!(ok, "search failed: {}", stderr);

    let ranked: Vec<&str> = stdout.lines().filter(|l| !l.starts_with(' ')).collect();
    assert_eq!(ranked.len(), 3);
    assert!(ranked[0].starts_with("1. [1.000] ") && ranked[0].ends_with("b.md"));
    assert!(ranked[1].starts_with("2. [0.707] ") && ranked[1].ends_with("a.md"));
    assert!(ranked[2].starts_with("3. [0.000] ") && ranked[2].ends_with("c.txt"));
    assert!(!stdout.contains("ignored.png"));
}

#[test]
fn test_search_empty_kb() {
    let (tmp, config) = setup_test_env();
    let empty = tmp.path().join("empty");
    fs::create_dir_all(&empty).unwrap();
    let (stdout, _, ok) = run_dpk_with_env(
        &config,
        &["search", "cat"],
        &[("KB_DIR", empty.to_str().unwrap())],
    );
    assert!(ok);
    assert_eq!(stdout.trim(), "No results.");
}

#[test]
fn test_context_deterministic() {
    let (_tmp, config) = setup_test_env();
    let (first, _, _) = run_dpk(&config, &["context", "cat dog bird"]);
    let (second, _, _) = run_dpk(&config, &["context", "cat dog bird"]);
    assert_eq!(first, second);
}

#[test]
fn test_context_unreachable_vector_db_is_empty() {
    let (_tmp, config) = setup_test_env();
    let (stdout, stderr, ok) = run_dpk_with_env(
        &config,
        &["context", "cat"],
        &[("QDRANT_URL", "http://127.0.0.1:9")],
    );
    assert!(ok, "context should degrade, got: {}", stderr);
    assert_eq!(stdout.trim(), "");
    assert!(stderr.contains("remote search failed"));
}

#[test]
fn test_ingest_requires_vector_db() {
    let (_tmp, config) = setup_test_env();
    let (_, stderr, ok) = run_dpk(&config, &["ingest", "https://example.com/wms"]);
    assert!(!ok);
    assert!(stderr.starts_with("Error: "));
    assert!(stderr.contains("QDRANT_URL"));
}

#[test]
fn test_config_redacts_secrets() {
    let (_tmp, config) = setup_test_env();
    let (stdout, stderr, ok) = run_dpk_with_env(
        &config,
        &["config"],
        &[("OPENAI_API_KEY", "sk-very-secret"), ("QDRANT_COLLECTION", "dc_kb")],
    );
    assert!(ok, "config failed: {}", stderr);
    assert!(!stdout.contains("sk-very-secret"));
    assert!(stdout.contains("api_key = \"***\""));
    assert!(stdout.contains("collection = \"dc_kb\""));
    assert!(stdout.contains("dims = 64"));
}

#[test]
fn test_invalid_config_errors() {
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("bad.toml");
    fs::write(&config, "[retrieval]\nlocal_k = 0\n").unwrap();
    let (_, stderr, ok) = run_dpk(&config, &["config"]);
    assert!(!ok);
    assert!(stderr.contains("local_k"));
}

#[test]
fn test_assume_without_provider_prints_placeholder() {
    let (tmp, config) = setup_test_env();
    let req = tmp.path().join("req.yaml");
    fs::write(&req, "site: cat\ndocks: 4\n").unwrap();

    let (stdout, stderr, ok) = run_dpk(
        &config,
        &["assume", req.to_str().unwrap(), "--module", "Inbound", "--show-context"],
    );
    assert!(ok, "assume failed: {}", stderr);
    assert!(stdout.starts_with("query: Inbound WMS design cat 4\n"));
    assert!(stdout.contains("### b.md (score="));
    assert!(stdout
        .trim_end()
        .ends_with("Assumptions auto-generated not available; please review."));
}

#[test]
fn test_assume_rejects_unknown_provider() {
    let (tmp, config) = setup_test_env();
    let req = tmp.path().join("req.yaml");
    fs::write(&req, "site: cat\n").unwrap();
    let (_, stderr, ok) = run_dpk(
        &config,
        &["assume", req.to_str().unwrap(), "--provider", "claude"],
    );
    assert!(!ok);
    assert!(stderr.contains("Unknown generation provider"));
}

#[test]
fn test_assume_rejects_non_mapping_yaml() {
    let (tmp, config) = setup_test_env();
    let req = tmp.path().join("req.yaml");
    fs::write(&req, "- just\n- a list\n").unwrap();
    let (_, stderr, ok) = run_dpk(&config, &["assume", req.to_str().unwrap()]);
    assert!(!ok);
    assert!(stderr.contains("YAML parse error"));
}

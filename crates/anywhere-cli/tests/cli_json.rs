use anywhere_testkit::{MockResponse, MockServer};
use assert_cmd::Command;
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

fn anywhere(workspace: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("anywhere"));
    cmd.current_dir(workspace)
        .env("HOME", workspace)
        .env_remove("USERPROFILE")
        .env_remove("ANYWHERE_BACKEND_URL");
    cmd
}

fn run_json(workspace: &Path, args: &[&str]) -> Value {
    let output = anywhere(workspace)
        .args(args)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    serde_json::from_slice(&output).expect("json output")
}

fn stderr_of(assert: &assert_cmd::assert::Assert) -> String {
    String::from_utf8_lossy(&assert.get_output().stderr).to_string()
}

fn write_settings(workspace: &Path, name: &str, body: &str) {
    let runtime = workspace.join(".anywhere");
    fs::create_dir_all(&runtime).expect("runtime dir");
    fs::write(runtime.join(name), body).expect("settings file");
}

#[test]
fn classify_reports_classification_and_endpoint() {
    let workspace = TempDir::new().expect("workspace");

    let address = run_json(workspace.path(), &["--json", "classify", "reddit.com"]);
    assert_eq!(address["classification"], "address");
    assert_eq!(address["endpoint"], "/proxy");
    assert_eq!(address["suggestions"], false);

    let enhanced = run_json(
        workspace.path(),
        &["--json", "classify", "reddit.com", "--enhanced"],
    );
    assert_eq!(enhanced["endpoint"], "/proxy-enhanced");

    let query = run_json(
        workspace.path(),
        &["--json", "classify", "best pizza near me"],
    );
    assert_eq!(query["classification"], "query");
    assert_eq!(query["endpoint"], "/smart-proxy");
    assert_eq!(query["suggestions"], true);
}

#[test]
fn classify_plain_text_output() {
    let workspace = TempDir::new().expect("workspace");
    anywhere(workspace.path())
        .args(["classify", "https://example.com/path"])
        .assert()
        .success()
        .stdout("address -> /proxy\n");
    anywhere(workspace.path())
        .args(["classify", "www.", "--smart"])
        .assert()
        .success()
        .stdout("address -> /smart-proxy\n");
}

#[test]
fn classify_routes_surrounding_whitespace_like_open() {
    let workspace = TempDir::new().expect("workspace");
    let padded = run_json(workspace.path(), &["--json", "classify", " reddit.com "]);
    assert_eq!(padded["classification"], "address");
    assert_eq!(padded["endpoint"], "/proxy");
}

#[test]
fn config_show_merges_layers_and_flags() {
    let workspace = TempDir::new().expect("workspace");
    write_settings(
        workspace.path(),
        "settings.json",
        r#"{"suggestions":{"debounce_ms":50},"dispatch":{"strategy":"smart"}}"#,
    );
    write_settings(
        workspace.path(),
        "settings.local.json",
        r#"{"backend":{"base_url":"http://local.example/api"}}"#,
    );

    let cfg = run_json(workspace.path(), &["--json", "config", "show"]);
    assert_eq!(cfg["suggestions"]["debounce_ms"], 50);
    assert_eq!(cfg["suggestions"]["blur_hide_ms"], 150);
    assert_eq!(cfg["dispatch"]["strategy"], "smart");
    assert_eq!(cfg["backend"]["base_url"], "http://local.example/api");

    let flagged = run_json(
        workspace.path(),
        &[
            "--json",
            "--backend-url",
            "http://flag.example/api",
            "config",
            "show",
        ],
    );
    assert_eq!(flagged["backend"]["base_url"], "http://flag.example/api");

    let from_env = anywhere(workspace.path())
        .env("ANYWHERE_BACKEND_URL", "http://env.example/api")
        .args(["--json", "config", "show"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let from_env: Value = serde_json::from_slice(&from_env).expect("json output");
    assert_eq!(from_env["backend"]["base_url"], "http://env.example/api");
}

#[test]
fn invalid_settings_fail_with_the_file_name() {
    let workspace = TempDir::new().expect("workspace");
    write_settings(workspace.path(), "settings.json", "{not json");
    let assert = anywhere(workspace.path())
        .args(["config", "show"])
        .assert()
        .failure();
    assert!(stderr_of(&assert).contains("settings.json"));
}

#[test]
fn config_path_lists_layers() {
    let workspace = TempDir::new().expect("workspace");
    let paths = run_json(workspace.path(), &["--json", "config", "path"]);
    assert!(
        paths["project_local"]
            .as_str()
            .is_some_and(|p| p.ends_with("settings.local.json"))
    );
    assert!(
        paths["legacy"]
            .as_str()
            .is_some_and(|p| p.ends_with("config.toml"))
    );
    assert_eq!(paths["env"], "ANYWHERE_BACKEND_URL");
}

#[test]
fn portals_hang_off_the_backend_url() {
    let workspace = TempDir::new().expect("workspace");
    let portals = run_json(
        workspace.path(),
        &[
            "--json",
            "--backend-url",
            "https://host.example/api/",
            "portals",
        ],
    );
    let portals = portals.as_array().expect("portal list");
    assert_eq!(portals.len(), 2);
    assert_eq!(portals[0]["name"], "gnmath");
    assert_eq!(portals[0]["url"], "https://host.example/api/gnmath-proxy");
    assert_eq!(portals[1]["url"], "https://host.example/api/clever-proxy");
}

#[test]
fn open_prints_backend_content() {
    let server = MockServer::start(|_| MockResponse::html(200, "<h1>Reddit</h1>"));
    let workspace = TempDir::new().expect("workspace");
    anywhere(workspace.path())
        .args(["--backend-url", server.base_url(), "open", "  reddit.com "])
        .assert()
        .success()
        .stdout("<h1>Reddit</h1>\n");

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].path(), "/api/proxy");
    assert_eq!(requests[0].body, r#"{"url":"reddit.com"}"#);
    assert!(workspace.path().join(".anywhere/observe.log").exists());
}

#[test]
fn open_json_reports_the_session_view() {
    let server = MockServer::start(|req| MockResponse::html(200, req.path().to_string()));
    let workspace = TempDir::new().expect("workspace");

    let view = run_json(
        workspace.path(),
        &[
            "--json",
            "--backend-url",
            server.base_url(),
            "open",
            "best pizza near me",
        ],
    );
    assert_eq!(view["phase"], "content");
    assert_eq!(view["result"]["state"], "content");
    assert_eq!(view["result"]["html"], "/api/smart-proxy");
    assert_eq!(view["result"]["classification"], "query");
    assert_eq!(view["result"]["source_input"], "best pizza near me");

    let enhanced = run_json(
        workspace.path(),
        &[
            "--json",
            "--backend-url",
            server.base_url(),
            "open",
            "reddit.com",
            "--enhanced",
        ],
    );
    assert_eq!(enhanced["result"]["html"], "/api/proxy-enhanced");
    assert_eq!(enhanced["mode"], "enhanced");
}

#[test]
fn open_failure_exits_nonzero_with_detail() {
    let server = MockServer::start(|_| MockResponse::json(504, r#"{"detail":"timeout"}"#));
    let workspace = TempDir::new().expect("workspace");
    let assert = anywhere(workspace.path())
        .args(["--backend-url", server.base_url(), "open", "slow.example"])
        .assert()
        .code(1)
        .stdout("");
    assert!(stderr_of(&assert).contains("error: timeout\n"));
}

#[test]
fn open_failure_without_detail_is_generic() {
    let server = MockServer::start(|_| MockResponse::html(500, "Internal Server Error"));
    let workspace = TempDir::new().expect("workspace");
    let output = anywhere(workspace.path())
        .args([
            "--json",
            "--backend-url",
            server.base_url(),
            "open",
            "down.example",
        ])
        .assert()
        .code(1)
        .get_output()
        .stdout
        .clone();
    let view: Value = serde_json::from_slice(&output).expect("json output");
    assert_eq!(view["result"]["state"], "error");
    assert_eq!(view["result"]["message"], "Failed to load website");
}

#[test]
fn open_rejects_blank_input_without_a_request() {
    let server = MockServer::start(|_| MockResponse::html(200, "unused"));
    let workspace = TempDir::new().expect("workspace");
    anywhere(workspace.path())
        .args(["--backend-url", server.base_url(), "open", "   "])
        .assert()
        .failure();
    assert_eq!(server.request_count(), 0);
}

#[test]
fn suggest_lists_backend_suggestions() {
    let server = MockServer::start(|_| {
        MockResponse::json(
            200,
            r#"{"suggestions":["best pizza places","best pizza recipe"]}"#,
        )
    });
    let workspace = TempDir::new().expect("workspace");
    let out = run_json(
        workspace.path(),
        &[
            "--json",
            "--backend-url",
            server.base_url(),
            "suggest",
            "best pizza",
        ],
    );
    assert_eq!(out["classification"], "query");
    assert_eq!(
        out["suggestions"],
        serde_json::json!(["best pizza places", "best pizza recipe"])
    );
    assert!(server.requests()[0].target.contains("q=best+pizza"));
}

#[test]
fn suggest_failure_and_short_input_degrade_to_empty() {
    let server = MockServer::start(|_| MockResponse::json(500, r#"{"detail":"down"}"#));
    let workspace = TempDir::new().expect("workspace");

    let failed = run_json(
        workspace.path(),
        &["--json", "--backend-url", server.base_url(), "suggest", "weather"],
    );
    assert_eq!(failed["suggestions"], serde_json::json!([]));
    assert_eq!(server.request_count(), 1);

    let short = run_json(
        workspace.path(),
        &["--json", "--backend-url", server.base_url(), "suggest", "ab"],
    );
    assert_eq!(short["suggestions"], serde_json::json!([]));
    let address = run_json(
        workspace.path(),
        &["--json", "--backend-url", server.base_url(), "suggest", "reddit.com"],
    );
    assert_eq!(address["suggestions"], serde_json::json!([]));
    assert_eq!(server.request_count(), 1);
}

#[test]
fn suggest_timeout_is_reported_under_verbose() {
    let server = MockServer::start(|_| {
        MockResponse::json(200, r#"{"suggestions":["weather today"]}"#)
            .with_delay(Duration::from_secs(3))
    });
    let workspace = TempDir::new().expect("workspace");
    write_settings(
        workspace.path(),
        "settings.json",
        r#"{"backend":{"timeout_seconds":1}}"#,
    );

    let assert = anywhere(workspace.path())
        .args([
            "--verbose",
            "--json",
            "--backend-url",
            server.base_url(),
            "suggest",
            "weather",
        ])
        .assert()
        .success();
    let out: Value = serde_json::from_slice(&assert.get_output().stdout).expect("json output");
    assert_eq!(out["suggestions"], serde_json::json!([]));
    let stderr = stderr_of(&assert);
    assert!(
        stderr.contains("suggestions for 'weather' failed"),
        "stderr: {stderr}"
    );
    assert!(stderr.contains("timed out"), "stderr: {stderr}");
}

#[test]
fn suggest_stays_quiet_without_verbose() {
    let server = MockServer::start(|_| MockResponse::json(500, r#"{"detail":"down"}"#));
    let workspace = TempDir::new().expect("workspace");
    let assert = anywhere(workspace.path())
        .args(["--backend-url", server.base_url(), "suggest", "weather"])
        .assert()
        .success()
        .stdout("");
    assert!(!stderr_of(&assert).contains("suggestions for"));
}

#[test]
fn games_subcommands_change_the_catalog() {
    let server = MockServer::start(|req| match (req.method.as_str(), req.path()) {
        ("POST", "/api/games/init-defaults") => {
            MockResponse::json(200, r#"{"message":"Initialized 8 default games"}"#)
        }
        ("POST", "/api/games") => MockResponse::json(
            200,
            r#"{"id":"g9","title":"Tetris","description":"","category":"Puzzle","game_url":"https://tetris.com/play-tetris","thumbnail":null}"#,
        ),
        ("DELETE", "/api/games/g9") => {
            MockResponse::json(200, r#"{"message":"Game deleted successfully"}"#)
        }
        _ => MockResponse::json(404, r#"{"detail":"Game not found"}"#),
    });
    let workspace = TempDir::new().expect("workspace");

    anywhere(workspace.path())
        .args(["--backend-url", server.base_url(), "games", "init"])
        .assert()
        .success()
        .stdout("Initialized 8 default games\n");

    let added = run_json(
        workspace.path(),
        &[
            "--json",
            "--backend-url",
            server.base_url(),
            "games",
            "add",
            "Tetris",
            "--url",
            "https://tetris.com/play-tetris",
            "--category",
            "Puzzle",
        ],
    );
    assert_eq!(added["id"], "g9");
    let sent: Value = serde_json::from_str(&server.requests()[1].body).expect("json body");
    assert_eq!(sent["game_url"], "https://tetris.com/play-tetris");
    assert_eq!(sent["description"], "");

    let removed = run_json(
        workspace.path(),
        &["--json", "--backend-url", server.base_url(), "games", "remove", "g9"],
    );
    assert_eq!(removed["message"], "Game deleted successfully");

    let assert = anywhere(workspace.path())
        .args(["--backend-url", server.base_url(), "games", "remove", "missing"])
        .assert()
        .failure();
    assert!(stderr_of(&assert).contains("Game not found"));
}

#[test]
fn catalog_commands_read_the_backend() {
    let server = MockServer::start(|req| match req.path() {
        "/api/games/categories" => MockResponse::json(200, r#"[{"category":"Arcade","count":2}]"#),
        "/api/games" => MockResponse::json(
            200,
            r#"[{"id":"g1","title":"Pac-Man","description":"Eat dots","category":"Arcade","game_url":"https://www.google.com/logos/2010/pacman10-i.html"}]"#,
        ),
        _ => MockResponse::json(200, r#"{"message":"AccessAnywhere - Unblock websites and play games!"}"#),
    });
    let workspace = TempDir::new().expect("workspace");

    let games = run_json(
        workspace.path(),
        &[
            "--json",
            "--backend-url",
            server.base_url(),
            "games",
            "--category",
            "Arcade",
        ],
    );
    assert_eq!(games[0]["title"], "Pac-Man");
    assert!(games[0]["thumbnail"].is_null());

    let categories = run_json(
        workspace.path(),
        &["--json", "--backend-url", server.base_url(), "categories"],
    );
    assert_eq!(categories[0]["count"], 2);

    let doctor = run_json(
        workspace.path(),
        &["--json", "--backend-url", server.base_url(), "doctor"],
    );
    assert_eq!(doctor["reachable"], true);
}

#[test]
fn doctor_fails_when_backend_is_down() {
    let workspace = TempDir::new().expect("workspace");
    anywhere(workspace.path())
        .args(["--backend-url", "http://127.0.0.1:9/api", "doctor"])
        .assert()
        .code(1);
}

#[test]
fn browse_refuses_without_a_terminal() {
    let workspace = TempDir::new().expect("workspace");
    let assert = anywhere(workspace.path())
        .arg("browse")
        .write_stdin("")
        .assert()
        .failure();
    assert!(stderr_of(&assert).contains("interactive terminal"));
}

//! Integration tests for depstage

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::fs;
    use std::io::{Cursor, Read, Write};
    use std::net::TcpListener;
    use std::path::Path;
    use std::thread;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    fn depstage(dir: &Path) -> Command {
        let mut cmd = cargo_bin_cmd!("depstage");
        cmd.current_dir(dir).env_remove("DEPSTAGE_CONFIG");
        cmd
    }

    fn sdl2_archive() -> Vec<u8> {
        let mut buffer = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buffer));
            let options = SimpleFileOptions::default();
            zip.add_directory("SDL2-2.28.5/", options).unwrap();
            zip.start_file("SDL2-2.28.5/include/SDL.h", options).unwrap();
            zip.write_all(b"#define SDL_MAJOR_VERSION 2\n").unwrap();
            zip.start_file("SDL2-2.28.5/src/SDL.c", options).unwrap();
            zip.write_all(b"int SDL_Init(void) { return 0; }\n").unwrap();
            zip.finish().unwrap();
        }
        buffer
    }

    /// Answer a single GET with `body`; returns a URL template for it
    fn serve_once(body: Vec<u8>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut request: Vec<u8> = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut buf) {
                        Ok(0) | Err(_) => break,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let header = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/zip\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                );
                let _ = stream.write_all(header.as_bytes());
                let _ = stream.write_all(&body);
            }
        });
        format!("http://{}/SDL2-{{version}}.zip", addr)
    }

    fn write_project(dir: &Path, source_url: &str) {
        let config = format!(
            r#"
[fetch]
timeout_secs = 10

[[dependency]]
name = "sdl2"
version = "2.28.5"
source_url = "{source_url}"
target_root = "cpp"
canonical_dir_name = "SDL2"
marker = "include/SDL.h"

[[task]]
name = "externalNativeBuildDebug"
command = ["true"]
"#
        );
        fs::write(dir.join("depstage.toml"), config).unwrap();
    }

    #[test]
    fn help_displays() {
        let temp = TempDir::new().unwrap();
        depstage(temp.path())
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains(
                "Idempotent staging of native library sources",
            ));
    }

    #[test]
    fn version_displays() {
        let temp = TempDir::new().unwrap();
        depstage(temp.path())
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("depstage"));
    }

    #[test]
    fn init_creates_config() {
        let temp = TempDir::new().unwrap();
        depstage(temp.path()).arg("init").assert().success();

        let content = fs::read_to_string(temp.path().join("depstage.toml")).unwrap();
        assert!(content.contains("[[dependency]]"));

        depstage(temp.path())
            .arg("init")
            .assert()
            .failure()
            .stderr(predicate::str::contains("already exists"));
    }

    #[test]
    fn missing_config_suggests_init() {
        let temp = TempDir::new().unwrap();
        depstage(temp.path())
            .arg("status")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Configuration file not found"))
            .stderr(predicate::str::contains("depstage init"));
    }

    #[test]
    fn status_reports_missing_dependency() {
        let temp = TempDir::new().unwrap();
        write_project(temp.path(), "https://example.invalid/SDL2-{version}.zip");

        depstage(temp.path())
            .args(["status", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("sdl2 missing"));
    }

    #[test]
    fn config_discovered_from_subdirectory() {
        let temp = TempDir::new().unwrap();
        write_project(temp.path(), "https://example.invalid/SDL2-{version}.zip");
        let nested = temp.path().join("app/src");
        fs::create_dir_all(&nested).unwrap();

        depstage(&nested)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("depstage.toml"));
    }

    #[test]
    fn tasks_show_staging_prerequisite() {
        let temp = TempDir::new().unwrap();
        write_project(temp.path(), "https://example.invalid/SDL2-{version}.zip");

        depstage(temp.path())
            .arg("tasks")
            .assert()
            .success()
            .stdout(predicate::str::contains("stage-sdl2"))
            .stdout(predicate::str::contains("externalNativeBuildDebug"));
    }

    #[test]
    fn run_unknown_task_fails() {
        let temp = TempDir::new().unwrap();
        write_project(temp.path(), "https://example.invalid/SDL2-{version}.zip");

        depstage(temp.path())
            .args(["run", "assembleRelease"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Task not found: assembleRelease"));
    }

    #[test]
    fn stage_downloads_once_then_skips() {
        let temp = TempDir::new().unwrap();
        write_project(temp.path(), &serve_once(sdl2_archive()));

        depstage(temp.path()).arg("stage").assert().success();

        let cpp = temp.path().join("cpp");
        assert!(cpp.join("SDL2/include/SDL.h").is_file());
        assert!(cpp.join("SDL2/src/SDL.c").is_file());
        assert!(!cpp.join("SDL2-2.28.5").exists());
        assert!(!temp.path().join("build/depstage/sdl2-2.28.5.zip").exists());

        // The server only answers once, so this must not touch the network
        depstage(temp.path())
            .arg("stage")
            .assert()
            .success()
            .stdout(predicate::str::contains("already staged"));

        let journal = fs::read_to_string(temp.path().join("build/depstage/journal.log")).unwrap();
        assert!(journal.contains("stage.completed"));
    }

    #[test]
    fn unreachable_source_leaves_nothing_behind() {
        let temp = TempDir::new().unwrap();
        // Bind then drop to get a port nothing listens on
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        write_project(
            temp.path(),
            &format!("http://127.0.0.1:{port}/SDL2-{{version}}.zip"),
        );

        depstage(temp.path())
            .arg("stage")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Fetching http://127.0.0.1"));

        assert!(!temp.path().join("cpp/SDL2").exists());
        assert!(!temp.path().join("build/depstage/sdl2-2.28.5.zip").exists());
    }

    #[test]
    fn clean_removes_staged_dir() {
        let temp = TempDir::new().unwrap();
        write_project(temp.path(), "https://example.invalid/SDL2-{version}.zip");
        fs::create_dir_all(temp.path().join("cpp/SDL2/include")).unwrap();
        fs::write(temp.path().join("cpp/SDL2/include/SDL.h"), "").unwrap();

        depstage(temp.path()).args(["clean", "--yes"]).assert().success();

        assert!(!temp.path().join("cpp/SDL2").exists());
    }
}

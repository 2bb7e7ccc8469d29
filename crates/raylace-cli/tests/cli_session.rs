use std::path::PathBuf;
use std::process::Command;

fn raylace_bin() -> String {
    std::env::var("CARGO_BIN_EXE_raylace").unwrap_or_else(|_| {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("../../target/debug/raylace")
            .to_string_lossy()
            .to_string()
    })
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("raylace_cli_{}_{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(dir.join("scenes")).unwrap();
    std::fs::create_dir_all(dir.join("models")).unwrap();
    dir
}

#[test]
fn render_writes_png_of_final_size() {
    let dir = scratch_dir("render");
    std::fs::write(
        dir.join("scenes/room.json"),
        r#"{"meshes": [{"file_name": "box.obj"}]}"#,
    )
    .unwrap();
    std::fs::write(dir.join("models/box.obj"), "v 0 0 0").unwrap();
    std::fs::write(
        dir.join("raylace.toml"),
        format!(
            "[assets]\nscenes_base = \"{}\"\nmodels_base = \"{}\"\n",
            dir.join("scenes").display(),
            dir.join("models").display()
        ),
    )
    .unwrap();

    let output = dir.join("out.png");
    let status = Command::new(raylace_bin())
        .arg("render")
        .arg("--config")
        .arg(dir.join("raylace.toml"))
        .args(["--scene", "room.json", "--width", "24", "--height", "16"])
        .args(["--workers", "3", "--turn", "0,0,4,2", "--resize", "12x10"])
        .arg("--output")
        .arg(&output)
        .status()
        .expect("failed to spawn raylace");
    assert!(status.success(), "raylace render failed: {status:?}");

    let image = image::open(&output).expect("output is not an image").to_rgba8();
    assert_eq!(image.dimensions(), (12, 10));
    assert!(image.pixels().all(|px| px.0[3] == 255));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn render_fails_for_missing_scene() {
    let dir = scratch_dir("missing");
    std::fs::write(
        dir.join("raylace.toml"),
        format!("[assets]\nscenes_base = \"{}\"\n", dir.join("scenes").display()),
    )
    .unwrap();

    let output = Command::new(raylace_bin())
        .arg("render")
        .arg("--config")
        .arg(dir.join("raylace.toml"))
        .args(["--scene", "absent.json", "--width", "4", "--height", "4"])
        .arg("--output")
        .arg(dir.join("never.png"))
        .output()
        .expect("failed to spawn raylace");
    assert!(!output.status.success());
    assert!(!dir.join("never.png").exists());

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn init_config_writes_loadable_defaults() {
    let dir = scratch_dir("init");
    let path = dir.join("raylace.toml");

    let status = Command::new(raylace_bin())
        .arg("init-config")
        .arg(&path)
        .status()
        .expect("failed to spawn raylace");
    assert!(status.success());

    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(contents.contains("[viewer]"));
    assert!(contents.contains("initial_scene"));

    let again = Command::new(raylace_bin())
        .arg("init-config")
        .arg(&path)
        .status()
        .expect("failed to spawn raylace");
    assert!(!again.success(), "init-config must not overwrite");

    let _ = std::fs::remove_dir_all(&dir);
}

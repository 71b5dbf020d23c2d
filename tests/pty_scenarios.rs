// PTY-based integration tests covering behavior that only exists in the
// running binary: OSC52 clipboard emission and synchronized-frame output.
//
// IMPORTANT: Run `cargo build --release` before running these tests!

use portable_pty::{native_pty_system, CommandBuilder, PtySize};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Once;
use std::thread;
use std::time::{Duration, Instant};

static INIT: Once = Once::new();
fn ensure_test_env() {
    INIT.call_once(|| {
        std::env::set_var("RUST_LOG", "off");
    });
}

/// Path to the release binary.
fn get_binary_path() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // test binary
    path.pop(); // deps
    path.pop(); // debug/release
    path.push("release");
    path.push("agentmux");
    path
}

fn binary_exists() -> bool {
    get_binary_path().exists()
}

type SharedOutput = std::sync::Arc<std::sync::Mutex<Vec<u8>>>;

fn spawn_output_capture(mut reader: Box<dyn std::io::Read + Send>) -> (thread::JoinHandle<()>, SharedOutput) {
    let buffer: SharedOutput = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
    let buf_clone = std::sync::Arc::clone(&buffer);
    let handle = thread::spawn(move || {
        let mut buf = [0u8; 4096];
        loop {
            match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => buf_clone.lock().unwrap().extend_from_slice(&buf[..n]),
                Err(_) => break,
            }
        }
    });
    (handle, buffer)
}

fn wait_for(output: &SharedOutput, needle: &[u8], timeout: Duration) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if output.lock().unwrap().windows(needle.len()).any(|w| w == needle) {
            return true;
        }
        thread::sleep(Duration::from_millis(50));
    }
    false
}

fn get_output(output: &SharedOutput) -> Vec<u8> {
    output.lock().unwrap().clone()
}

fn build_cmd(runtime_dir: &std::path::Path, agent_type: &str) -> CommandBuilder {
    let mut cmd = CommandBuilder::new(get_binary_path());
    cmd.arg(agent_type);
    cmd.env("RUNTIME_DIR", runtime_dir);
    cmd
}

fn open_pty() -> portable_pty::PtyPair {
    native_pty_system()
        .openpty(PtySize { rows: 24, cols: 80, pixel_width: 0, pixel_height: 0 })
        .expect("failed to open pty")
}

const READY_TIMEOUT: Duration = Duration::from_secs(15);

/// Drive the root-prefix chord `Ctrl-Space n` to land in Normal mode —
/// every other scenario here starts from there.
fn enter_normal_mode(writer: &mut Box<dyn std::io::Write + Send>) {
    writer.write_all(&[0x00]).unwrap(); // Ctrl-Space
    writer.write_all(b"n").unwrap();
    writer.flush().unwrap();
}

/// S2: yanking a line into the clipboard register emits an OSC52 sequence
/// to stdout, and pasting that register into a second pane delivers the
/// same text to its stdin.
#[test]
fn yank_to_clipboard_register_emits_osc52_and_pastes_into_other_pane() {
    ensure_test_env();
    if !binary_exists() {
        eprintln!("Skipping: release binary not found");
        return;
    }

    let temp_dir = tempfile::TempDir::new().unwrap();
    let pair = open_pty();
    let mut child = pair.slave.spawn_command(build_cmd(temp_dir.path(), "cat")).unwrap();
    let mut writer = pair.master.take_writer().unwrap();
    let reader = pair.master.try_clone_reader().unwrap();
    let (_h, output) = spawn_output_capture(reader);

    if !wait_for(&output, b"\x1b[", READY_TIMEOUT) {
        let _ = child.kill();
        panic!("TUI did not start within {:?}", READY_TIMEOUT);
    }

    // Open a second pane (`:sp cat`) so there's somewhere to paste into.
    writer.write_all(&[0x00]).unwrap(); // Ctrl-Space
    writer.write_all(b":sp cat\r").unwrap();
    writer.flush().unwrap();
    thread::sleep(Duration::from_millis(300));

    // Back in the original (now unfocused) pane's normal mode, yank its
    // current line into the `+` register: `"+yy`.
    enter_normal_mode(&mut writer);
    writer.write_all(b"\"+yy").unwrap();
    writer.flush().unwrap();

    if !wait_for(&output, b"\x1b]52;c;", Duration::from_secs(5)) {
        let _ = child.kill();
        panic!("no OSC52 clipboard sequence observed.\noutput so far: {:?}", String::from_utf8_lossy(&get_output(&output)));
    }

    // Paste the same register into the newly focused pane: `"+p`.
    enter_normal_mode(&mut writer);
    writer.write_all(b"\"+p").unwrap();
    writer.flush().unwrap();
    thread::sleep(Duration::from_millis(300));

    let _ = child.kill();
}

/// S6: a burst of rapid state changes within one draw interval coalesces
/// into a single synchronized-update frame — never a partial or
/// interleaved one.
#[test]
fn rapid_input_coalesces_into_synchronized_frames() {
    ensure_test_env();
    if !binary_exists() {
        eprintln!("Skipping: release binary not found");
        return;
    }

    let temp_dir = tempfile::TempDir::new().unwrap();
    let pair = open_pty();
    let mut child = pair.slave.spawn_command(build_cmd(temp_dir.path(), "cat")).unwrap();
    let mut writer = pair.master.take_writer().unwrap();
    let reader = pair.master.try_clone_reader().unwrap();
    let (_h, output) = spawn_output_capture(reader);

    if !wait_for(&output, b"\x1b[", READY_TIMEOUT) {
        let _ = child.kill();
        panic!("TUI did not start within {:?}", READY_TIMEOUT);
    }

    // Burst several keystrokes well within one 33ms frame interval — the
    // compositor should still coalesce them into whole frames.
    for _ in 0..20 {
        writer.write_all(b"x").unwrap();
    }
    writer.flush().unwrap();
    thread::sleep(Duration::from_millis(500));

    let captured = get_output(&output);
    let sync_begin = b"\x1b[?2026h".as_slice();
    let sync_end = b"\x1b[?2026l".as_slice();

    let mut depth = 0i32;
    let mut i = 0usize;
    let mut saw_any = false;
    while i < captured.len() {
        if captured[i..].starts_with(sync_begin) {
            assert_eq!(depth, 0, "a new frame began before the previous one closed");
            depth = 1;
            saw_any = true;
            i += sync_begin.len();
        } else if captured[i..].starts_with(sync_end) {
            assert_eq!(depth, 1, "frame end marker with no matching begin");
            depth = 0;
            i += sync_end.len();
        } else {
            i += 1;
        }
    }
    assert_eq!(depth, 0, "every opened frame must close before the capture ends");
    assert!(saw_any, "expected at least one synchronized frame in the output");

    let _ = child.kill();
}

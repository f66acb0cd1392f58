use std::{
    fs,
    future::Future,
    io::{BufReader, Write},
    path::Path,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use eyre::WrapErr;
use serde::de::DeserializeOwned;
use tracing::debug;

const SPINNER: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

/// Runs a loading animation on stderr until `future` completes.
pub async fn print_loading_until_async<F, T>(message: &str, future: F) -> T
where
    F: Future<Output = T>,
{
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = running.clone();
    let message = message.to_string();

    // The runtime is single threaded, so the animation gets its own OS thread.
    let animation = std::thread::spawn(move || {
        let mut stderr = std::io::stderr();
        let mut i = 0;

        while running_clone.load(Ordering::Relaxed) {
            let _ = write!(stderr, "\r{} {} ", message, SPINNER[i]);
            let _ = stderr.flush();
            std::thread::sleep(Duration::from_millis(100));
            i = (i + 1) % SPINNER.len();
        }

        let _ = write!(stderr, "\r{}\r", " ".repeat(message.chars().count() + 2));
        let _ = stderr.flush();
    });

    let result = future.await;

    running.store(false, Ordering::Relaxed);
    let _ = animation.join();

    result
}

/// Load an object from a JSON file.
pub fn load_from_json_file<P: AsRef<Path>, T: DeserializeOwned>(path: P) -> eyre::Result<T> {
    let path = path.as_ref();
    debug!(?path, "Loading JSON file");

    let file = fs::File::open(path).wrap_err_with(|| format!("Failed to open {path:?}"))?;
    let reader = BufReader::new(file);

    serde_json::from_reader(reader).wrap_err_with(|| format!("Failed to read JSON from {path:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sample {
        name: String,
    }

    #[test]
    fn loads_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.json");
        fs::write(&path, r#"{ "name": "safe" }"#).unwrap();

        let sample: Sample = load_from_json_file(&path).unwrap();
        assert_eq!(sample, Sample { name: "safe".into() });
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = load_from_json_file::<_, Sample>("/definitely/not/here.json").unwrap_err();
        assert!(err.to_string().contains("here.json"));
    }

    #[tokio::test]
    async fn loading_returns_future_output() {
        assert_eq!(print_loading_until_async("Working", async { 42 }).await, 42);
    }
}

//! Chromium-backed session using chromiumoxide.

use super::{ArtifactRef, CookieInfo, NavigationOutcome, ProbeRequest, Session, SessionError};
use crate::probes;
use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::Engine;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::{Page, ScreenshotParams};
use chrono::Utc;
use futures::StreamExt;
use std::path::PathBuf;
use std::time::Instant;

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. RECON_CHROMIUM_PATH env
    if let Ok(p) = std::env::var("RECON_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. ~/.recon/chromium/
    if let Some(home) = dirs::home_dir() {
        let candidates = if cfg!(target_os = "macos") {
            vec![
                home.join(".recon/chromium/chrome-mac-arm64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".recon/chromium/chrome-mac-x64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".recon/chromium/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".recon/chromium/chrome"),
            ]
        } else {
            vec![
                home.join(".recon/chromium/chrome-linux64/chrome"),
                home.join(".recon/chromium/chrome"),
            ]
        };
        for c in candidates {
            if c.exists() {
                return Some(c);
            }
        }
    }

    // 3. System PATH
    if let Ok(path) = which::which("google-chrome") {
        return Some(path);
    }
    if let Ok(path) = which::which("chromium") {
        return Some(path);
    }
    if let Ok(path) = which::which("chromium-browser") {
        return Some(path);
    }

    // 4. Common macOS locations
    if cfg!(target_os = "macos") {
        let common =
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Directory where screenshot artifacts land.
pub fn artifacts_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join(".recon")
        .join("artifacts")
}

/// A headless Chromium session: one browser, one page.
pub struct ChromiumSession {
    browser: Browser,
    page: Page,
}

impl ChromiumSession {
    /// Launch a headless Chromium and open a blank page.
    pub async fn launch() -> Result<Self> {
        let chrome_path =
            find_chromium().context("Chromium not found. Run `recon doctor` for details.")?;

        let config = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-background-networking")
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        // Spawn the handler task
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .context("failed to create page")?;

        Ok(Self { browser, page })
    }

    /// Map a chromiumoxide error at the probe boundary. A closed transport
    /// means the session is gone; anything else is a recoverable failure.
    fn classify(e: chromiumoxide::error::CdpError, recoverable: fn(String) -> SessionError) -> SessionError {
        let msg = e.to_string();
        let lowered = msg.to_ascii_lowercase();
        if lowered.contains("closed")
            || lowered.contains("disconnected")
            || lowered.contains("connection")
        {
            SessionError::Unreachable(msg)
        } else {
            recoverable(msg)
        }
    }

    async fn evaluate(&self, script: &str, recoverable: fn(String) -> SessionError)
        -> Result<serde_json::Value, SessionError>
    {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| Self::classify(e, recoverable))?;
        result
            .into_value()
            .map_err(|e| recoverable(format!("result conversion failed: {e:?}")))
    }
}

#[async_trait]
impl Session for ChromiumSession {
    async fn navigate(
        &mut self,
        url: &str,
        timeout_ms: u64,
    ) -> Result<NavigationOutcome, SessionError> {
        let start = Instant::now();

        let result = tokio::time::timeout(
            std::time::Duration::from_millis(timeout_ms),
            self.page.goto(url),
        )
        .await;

        let load_time_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(Ok(_response)) => {
                let _ = self.page.wait_for_navigation().await;

                let final_url = self
                    .page
                    .url()
                    .await
                    .unwrap_or_default()
                    .map(|u| u.to_string())
                    .unwrap_or_else(|| url.to_string());

                Ok(NavigationOutcome {
                    final_url,
                    load_time_ms,
                })
            }
            Ok(Err(e)) => Err(SessionError::Unreachable(format!("navigation failed: {e}"))),
            Err(_) => Err(SessionError::Unreachable(format!(
                "navigation timed out after {timeout_ms}ms"
            ))),
        }
    }

    async fn run_probe(
        &self,
        request: ProbeRequest,
    ) -> Result<serde_json::Value, SessionError> {
        let recoverable = match request {
            ProbeRequest::Tactic(_) => SessionError::Probe,
            _ => SessionError::Capture,
        };
        self.evaluate(probes::script_for(request), recoverable).await
    }

    async fn capture_artifact(&self, label: &str) -> Option<ArtifactRef> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        let bytes = match self.page.screenshot(params).await {
            Ok(b) => b,
            Err(e) => {
                tracing::debug!(label, error = %e, "screenshot failed");
                return None;
            }
        };

        let captured_at = Utc::now();
        let dir = artifacts_dir();
        let filename = format!("{label}_{}.png", captured_at.format("%Y%m%dT%H%M%S%3f"));
        let path = dir.join(&filename);

        if std::fs::create_dir_all(&dir).is_ok() && std::fs::write(&path, &bytes).is_ok() {
            return Some(ArtifactRef {
                label: label.to_string(),
                path: Some(path.to_string_lossy().into_owned()),
                data_base64: None,
                captured_at,
            });
        }

        // No writable artifact directory; inline the bytes instead.
        Some(ArtifactRef {
            label: label.to_string(),
            path: None,
            data_base64: Some(base64::engine::general_purpose::STANDARD.encode(&bytes)),
            captured_at,
        })
    }

    async fn current_url(&self) -> Result<String, SessionError> {
        let url = self
            .page
            .url()
            .await
            .map_err(|e| Self::classify(e, SessionError::Capture))?
            .map(|u| u.to_string())
            .unwrap_or_default();
        Ok(url)
    }

    async fn current_title(&self) -> Result<String, SessionError> {
        let value = self.evaluate("document.title", SessionError::Capture).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn cookies(&self) -> Result<Vec<CookieInfo>, SessionError> {
        let cookies = self
            .page
            .get_cookies()
            .await
            .map_err(|e| Self::classify(e, SessionError::Capture))?;
        Ok(cookies
            .into_iter()
            .map(|c| CookieInfo {
                name: c.name,
                value: c.value,
                domain: c.domain,
            })
            .collect())
    }

    async fn close(self: Box<Self>) -> Result<(), SessionError> {
        let _ = self.page.close().await;
        let mut browser = self.browser;
        let _ = browser.close().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // Requires Chromium to be installed
    async fn test_chromium_navigate_and_probe() {
        let mut session = ChromiumSession::launch()
            .await
            .expect("failed to launch session");

        let nav = session
            .navigate(
                "data:text/html,<h1>Hello</h1><button>Go</button><p>World</p>",
                10000,
            )
            .await
            .expect("navigation failed");
        assert!(nav.load_time_ms < 10000);

        let metrics = session
            .run_probe(ProbeRequest::Metrics)
            .await
            .expect("metrics probe failed");
        assert!(metrics["total_elements"].as_u64().unwrap() > 0);
        assert_eq!(metrics["buttons"].as_u64().unwrap(), 1);

        let title = session.current_title().await.expect("title failed");
        assert_eq!(title, "");

        Box::new(session).close().await.expect("close failed");
    }
}

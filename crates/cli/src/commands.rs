use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use lpgen_client::{ClientConfig, LpApi};
use lpgen_core::GenerationRequest;
use lpgen_preview::PreviewRenderer;
use lpgen_session::{save_bundle, GenerationController, GenerationState, PollConfig, Session};

use crate::cli::{OutputArgs, RequestArgs};
use crate::output::{format_jobs, format_snapshot, progress_line};

/// Settings shared by all subcommands.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub client: ClientConfig,
    pub poll: PollConfig,
}

impl AppConfig {
    /// Load from the environment; `api_url` from the command line wins.
    pub fn load(api_url: Option<&str>) -> anyhow::Result<Self> {
        let mut client = ClientConfig::from_env()?;
        if let Some(url) = api_url {
            client = client.with_api_url(url);
        }
        let poll = PollConfig::from_env()?;
        Ok(Self { client, poll })
    }

    fn api(&self) -> anyhow::Result<Arc<LpApi>> {
        Ok(Arc::new(LpApi::new(&self.client)?))
    }
}

// ============================================================================
// generate subcommand
// ============================================================================

pub async fn cmd_generate(
    config: &AppConfig,
    request_file: Option<&Path>,
    fields: RequestArgs,
    output: &OutputArgs,
) -> anyhow::Result<()> {
    let request = load_request(request_file, fields)?;
    let controller = controller(config, output)?;

    let job_id = controller
        .submit(request)
        .await?
        .context("a generation is already in progress")?;
    println!("Started job {job_id}");

    let session = follow_to_end(&controller).await?;
    finish(&controller, session, output).await
}

// ============================================================================
// retry subcommand
// ============================================================================

pub async fn cmd_retry(config: &AppConfig, job_id: &str, output: &OutputArgs) -> anyhow::Result<()> {
    let api = config.api()?;
    let new_id = api.retry_job(job_id).await?;
    println!("Retrying {job_id} as {new_id}");

    let controller = controller(config, output)?;
    controller.follow(&new_id)?;

    let session = follow_to_end(&controller).await?;
    finish(&controller, session, output).await
}

// ============================================================================
// status / download / jobs subcommands
// ============================================================================

pub async fn cmd_status(config: &AppConfig, job_id: &str, json: bool) -> anyhow::Result<()> {
    let snapshot = config.api()?.get_job_status(job_id).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print!("{}", format_snapshot(&snapshot));
    }
    Ok(())
}

pub async fn cmd_download(config: &AppConfig, job_id: &str, out: &Path) -> anyhow::Result<()> {
    let bytes = config.api()?.download_results(job_id).await?;
    let path = save_bundle(out, job_id, &bytes)
        .await
        .with_context(|| format!("failed to write bundle into {}", out.display()))?;
    println!("Saved {}", path.display());
    Ok(())
}

pub async fn cmd_jobs(config: &AppConfig, json: bool) -> anyhow::Result<()> {
    let jobs = config.api()?.list_jobs().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&jobs)?);
    } else {
        print!("{}", format_jobs(&jobs));
    }
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

fn controller(config: &AppConfig, output: &OutputArgs) -> anyhow::Result<GenerationController> {
    let renderer = PreviewRenderer::default().with_viewport(output.viewport);
    Ok(GenerationController::new(
        config.api()?,
        config.poll.clone(),
        renderer,
    ))
}

/// Print progress until the session settles. Ctrl-C shuts the controller
/// down and aborts.
async fn follow_to_end(controller: &GenerationController) -> anyhow::Result<Session> {
    let mut updates = controller.subscribe();
    let mut last_line = String::new();

    loop {
        let session = updates.borrow_and_update().clone();
        let line = progress_line(&session);
        if line != last_line {
            println!("{line}");
            last_line = line;
        }
        if !session.state.is_busy() {
            return Ok(session);
        }

        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    return Ok(controller.session());
                }
            }
            _ = tokio::signal::ctrl_c() => {
                controller.shutdown();
                bail!("interrupted");
            }
        }
    }
}

/// Write the preview (and optionally the bundle) of a settled session.
async fn finish(
    controller: &GenerationController,
    session: Session,
    output: &OutputArgs,
) -> anyhow::Result<()> {
    match session.state {
        GenerationState::Completed => {}
        GenerationState::Error => {
            bail!(session.error.unwrap_or_else(|| lpgen_session::UNKNOWN_ERROR.to_string()))
        }
        other => bail!("generation stopped while {other}"),
    }

    let job_id = session.job_id.as_deref().unwrap_or_default();
    match &session.preview {
        Some(preview) => {
            let dir = output.out.join(job_id);
            let files = preview
                .write_to(&dir)
                .with_context(|| format!("failed to write preview into {}", dir.display()))?;
            println!("Preview:  {}", files.document.display());
            println!("Frame:    {}", files.frame.display());
        }
        None => eprintln!("Generation finished but returned no page data"),
    }

    if output.download {
        let path = controller.download_to(&output.out).await?;
        println!("Bundle:   {}", path.display());
    }
    Ok(())
}

/// Build the request from an optional JSON file, with flags taking
/// precedence over file values.
pub fn load_request(file: Option<&Path>, fields: RequestArgs) -> anyhow::Result<GenerationRequest> {
    let base = match file {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let request: GenerationRequest = serde_json::from_str(&raw)
                .with_context(|| format!("{} is not a valid request", path.display()))?;
            Some(request)
        }
        None => None,
    };

    fn pick(
        flag: Option<String>,
        file: Option<&String>,
        name: &str,
    ) -> anyhow::Result<String> {
        flag.or_else(|| file.cloned())
            .with_context(|| format!("missing --{name} (or a request file)"))
    }

    Ok(GenerationRequest {
        service_name: pick(fields.service_name, base.as_ref().map(|r| &r.service_name), "service-name")?,
        service_type: pick(fields.service_type, base.as_ref().map(|r| &r.service_type), "service-type")?,
        target_audience: pick(
            fields.target_audience,
            base.as_ref().map(|r| &r.target_audience),
            "target-audience",
        )?,
        features: pick(fields.features, base.as_ref().map(|r| &r.features), "features")?,
        testimonials: pick(fields.testimonials, base.as_ref().map(|r| &r.testimonials), "testimonials")?,
        company_name: pick(fields.company_name, base.as_ref().map(|r| &r.company_name), "company-name")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUEST_JSON: &str = r#"{
        "serviceName": "EasySpeak",
        "serviceType": "オンライン英会話スクール",
        "targetAudience": "社会人向け",
        "features": "24時間対応、パーソナルカリキュラム",
        "testimonials": "講師情報、お客様の声",
        "companyName": "株式会社アブソリュート"
    }"#;

    #[test]
    fn request_is_read_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("request.json");
        std::fs::write(&path, REQUEST_JSON).unwrap();

        let request = load_request(Some(&path), RequestArgs::default()).unwrap();
        assert_eq!(request.service_name, "EasySpeak");
        assert_eq!(request.company_name, "株式会社アブソリュート");
    }

    #[test]
    fn flags_override_file_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("request.json");
        std::fs::write(&path, REQUEST_JSON).unwrap();

        let fields = RequestArgs {
            service_name: Some("EasySpeak Pro".into()),
            ..RequestArgs::default()
        };
        let request = load_request(Some(&path), fields).unwrap();
        assert_eq!(request.service_name, "EasySpeak Pro");
        assert_eq!(request.target_audience, "社会人向け");
    }

    #[test]
    fn missing_fields_are_reported_by_flag_name() {
        let fields = RequestArgs {
            service_name: Some("EasySpeak".into()),
            ..RequestArgs::default()
        };
        let err = load_request(None, fields).unwrap_err();
        assert_eq!(err.to_string(), "missing --service-type (or a request file)");
    }

    #[test]
    fn malformed_file_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = load_request(Some(&path), RequestArgs::default()).unwrap_err();
        assert!(err.to_string().contains("broken.json is not a valid request"));
    }
}

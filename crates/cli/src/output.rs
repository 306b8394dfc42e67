use lpgen_core::{JobSnapshot, Step, StepStatus};
use lpgen_session::{GenerationState, Session};

// ============================================================================
// Console output
// ============================================================================

/// One-line progress summary, e.g. `[processing]  40.0%  Design`.
pub fn progress_line(session: &Session) -> String {
    let step = match session.state {
        GenerationState::Processing => session
            .current_step()
            .map(|s| s.name.as_str())
            .unwrap_or("Finishing"),
        _ => "",
    };
    format!(
        "[{:>10}] {:>5.1}%  {}",
        session.state.as_str(),
        session.progress(),
        step
    )
    .trim_end()
    .to_string()
}

fn step_marker(status: StepStatus) -> &'static str {
    match status {
        StepStatus::Pending => "[ ]",
        StepStatus::Processing => "[~]",
        StepStatus::Completed => "[x]",
        StepStatus::Error => "[!]",
    }
}

fn format_step(step: &Step) -> String {
    let name = if step.name.is_empty() {
        step.id.label()
    } else {
        step.name.as_str()
    };
    let mut line = format!("  {} {}", step_marker(step.status), name);
    if step.status == StepStatus::Processing {
        line.push_str(&format!(" ({:.0}%)", step.progress.clamp(0.0, 100.0)));
    }
    line
}

/// Multi-line status report for `lpgen status`.
pub fn format_snapshot(snapshot: &JobSnapshot) -> String {
    let mut out = String::new();
    out.push_str(&format!("Job:      {}\n", snapshot.job_id));
    out.push_str(&format!("Status:   {}\n", snapshot.status));
    out.push_str(&format!("Progress: {:.1}%\n", snapshot.progress_percent()));
    if !snapshot.current_step.is_empty() {
        out.push_str(&format!("Step:     {}\n", snapshot.current_step));
    }
    if let Some(error) = snapshot.error.as_deref().filter(|e| !e.is_empty()) {
        out.push_str(&format!("Error:    {error}\n"));
    }
    for step in &snapshot.steps {
        out.push_str(&format_step(step));
        out.push('\n');
    }
    out
}

/// Job table for `lpgen jobs`.
pub fn format_jobs(jobs: &[JobSnapshot]) -> String {
    if jobs.is_empty() {
        return "No jobs\n".to_string();
    }
    let width = jobs.iter().map(|j| j.job_id.len()).max().unwrap_or(0).max(6);
    let mut out = format!("{:<width$}  {:<10}  {:>6}\n", "JOB ID", "STATUS", "PROG");
    for job in jobs {
        out.push_str(&format!(
            "{:<width$}  {:<10}  {:>5.0}%\n",
            job.job_id,
            job.status.as_str(),
            job.progress_percent()
        ));
    }
    out
}

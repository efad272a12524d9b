//! CLI handlers for `semplan course` subcommands.

use anyhow::{Context, Result};

use semplan_core::{CourseDraft, PlanSession};

use crate::CourseCommands;
use crate::plan_cmds::{finish, load, resolve};

/// Dispatch a `CourseCommands` variant to the appropriate handler.
pub async fn run_course_command(command: CourseCommands, session: &mut PlanSession) -> Result<()> {
    match command {
        CourseCommands::List { json } => {
            load(session).await?;
            cmd_list(session, json)
        }
        CourseCommands::Save {
            code,
            name,
            credits,
            required,
            prereq,
            semester,
        } => {
            let mut draft = CourseDraft::new(code, name, credits).required(required);
            draft.semester = semester;
            for code in &prereq {
                draft.add_prerequisite(code);
            }
            let outcome = session.save_course(&draft).await;
            finish(session, outcome)
        }
        CourseCommands::Set {
            course,
            field,
            value,
        } => {
            load(session).await?;
            let course_id = resolve(session, &course)?;
            let outcome = session.update_course_field(&course_id, &field, &value).await;
            finish(session, outcome)
        }
    }
}

fn cmd_list(session: &PlanSession, json: bool) -> Result<()> {
    let view = session.browse_view().context("course catalog is not loaded")?;

    if json {
        let rendered =
            serde_json::to_string_pretty(&view).context("failed to serialize course list")?;
        println!("{rendered}");
        return Ok(());
    }

    if view.entries.is_empty() {
        println!("No courses yet. Use `semplan course save --code .. --name .. --credits ..`.");
        return Ok(());
    }

    let code_w = view
        .entries
        .iter()
        .map(|e| e.course.code.len())
        .max()
        .unwrap_or(4)
        .max(4);
    let name_w = view
        .entries
        .iter()
        .map(|e| e.course.name.len())
        .max()
        .unwrap_or(4)
        .max(4);

    println!(
        "{:<code_w$}  {:<name_w$}  {:>7}  {:<8}  {:<5}  {:<8}  PREREQUISITES",
        "CODE", "NAME", "CREDITS", "REQUIRED", "GRADE", "SEMESTER"
    );
    for entry in &view.entries {
        let course = &entry.course;
        let placed = entry
            .placed_in
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<code_w$}  {:<name_w$}  {:>7}  {:<8}  {:<5}  {:<8}  {}",
            course.code,
            course.name,
            course.credits,
            if course.is_required { "yes" } else { "no" },
            course.grade.as_deref().unwrap_or("-"),
            placed,
            course.prerequisites.join(", "),
        );
    }

    Ok(())
}

//! CLI handlers for `semplan plan` subcommands.
//!
//! Implements:
//! - `semplan plan show [--json]`               -- print the plan view
//! - `semplan plan add <semester> <course>`     -- place a course
//! - `semplan plan remove <semester> <course>`  -- unplace a course
//! - `semplan plan move <course> <from> <to>`   -- move a course between semesters
//! - `semplan plan resize <n> [-y|-yy]`         -- change the number of semesters

use anyhow::{Context, Result, bail};

use semplan_core::plan::{CANONICAL_SEMESTER_COUNTS, MAX_SEMESTER_COUNT};
use semplan_core::{ActionOutcome, CourseId, PlanError, PlanSession, Severity};

use crate::PlanCommands;
use crate::prompt::LineConfirmer;
use crate::resolve::resolve_course;

const NOT_LOGGED_IN: &str = "not logged in; run `semplan login <email>` first";

// -----------------------------------------------------------------------
// Public entry point
// -----------------------------------------------------------------------

/// Dispatch a `PlanCommands` variant to the appropriate handler.
pub async fn run_plan_command(command: PlanCommands, session: &mut PlanSession) -> Result<()> {
    load(session).await?;

    match command {
        PlanCommands::Show { json } => cmd_show(session, json),
        PlanCommands::Add { semester, course } => {
            let course_id = resolve(session, &course)?;
            let outcome = session.add_course(semester, &course_id).await;
            finish(session, outcome)
        }
        PlanCommands::Remove { semester, course } => {
            let course_id = resolve(session, &course)?;
            let outcome = session.remove_course(semester, &course_id).await;
            finish(session, outcome)
        }
        PlanCommands::Move { course, from, to } => {
            let course_id = resolve(session, &course)?;
            let outcome = session.move_course(&course_id, from, to).await;
            finish(session, outcome)
        }
        PlanCommands::Resize { total, yes } => {
            if let Some(note) = unusual_length_note(total) {
                eprintln!("{note}");
            }
            let mut confirmer = LineConfirmer::stdio(yes);
            let outcome = session.resize_semesters(total, &mut confirmer).await;
            finish(session, outcome)
        }
    }
}

// -----------------------------------------------------------------------
// Shared helpers
// -----------------------------------------------------------------------

/// Refresh the session mirror.
pub(crate) async fn load(session: &mut PlanSession) -> Result<()> {
    match session.refresh().await {
        Ok(()) => Ok(()),
        Err(PlanError::NotAuthenticated) => bail!(NOT_LOGGED_IN),
        Err(e) => {
            session.drain_notices();
            Err(e).context("failed to load course plan")
        }
    }
}

pub(crate) fn resolve(session: &PlanSession, input: &str) -> Result<CourseId> {
    let catalog = session.catalog().context("course catalog is not loaded")?;
    resolve_course(catalog, session.plan(), input)
}

/// Print pending notices and turn the outcome into a command result.
pub(crate) fn finish(session: &mut PlanSession, outcome: ActionOutcome) -> Result<()> {
    for notice in session.drain_notices() {
        match notice.severity {
            Severity::Success | Severity::Info => println!("{}", notice.message),
            Severity::Warning | Severity::Error => {
                eprintln!("{}: {}", notice.severity, notice.message)
            }
        }
    }

    match outcome {
        ActionOutcome::Committed => Ok(()),
        ActionOutcome::Unchanged => {
            println!("Nothing to change.");
            Ok(())
        }
        ActionOutcome::Declined => {
            println!("Resize cancelled; the plan was not changed.");
            Ok(())
        }
        ActionOutcome::Aborted => bail!(NOT_LOGGED_IN),
        ActionOutcome::Rejected(e) => Err(e).context("nothing was changed"),
        ActionOutcome::Unsaved(e) => Err(e).context("the change was not saved"),
    }
}

// -----------------------------------------------------------------------
// semplan plan show
// -----------------------------------------------------------------------

fn cmd_show(session: &PlanSession, json: bool) -> Result<()> {
    let view = session.plan_view().context("course plan is not loaded")?;

    if json {
        let rendered =
            serde_json::to_string_pretty(&view).context("failed to serialize plan view")?;
        println!("{rendered}");
        return Ok(());
    }

    println!(
        "Course plan: {} semesters, {} credits",
        view.total_semesters, view.total_credits
    );

    for semester in &view.semesters {
        println!();
        println!("Semester {}  ({} credits)", semester.id, semester.credits);
        if semester.courses.is_empty() {
            println!("  (empty)");
            continue;
        }
        let code_w = semester
            .courses
            .iter()
            .map(|c| c.code.len())
            .max()
            .unwrap_or(4)
            .max(4);
        for course in &semester.courses {
            let mut line = format!(
                "  {:<code_w$}  {}  ({} cr)",
                course.code, course.name, course.credits
            );
            if course.is_required {
                line.push_str("  required");
            }
            if let Some(grade) = &course.grade {
                line.push_str(&format!("  grade {grade}"));
            }
            println!("{line}");
        }
    }

    if !view.dangling.is_empty() {
        println!();
        println!(
            "{} placed course(s) are no longer in your catalog and are hidden.",
            view.dangling.len()
        );
    }

    Ok(())
}

/// Hint for a valid length the plan view would not offer. Invalid lengths
/// are left to the resize error.
fn unusual_length_note(total: u32) -> Option<String> {
    if !(1..=MAX_SEMESTER_COUNT).contains(&total) || CANONICAL_SEMESTER_COUNTS.contains(&total) {
        return None;
    }
    let usual = CANONICAL_SEMESTER_COUNTS.map(|n| n.to_string()).join(", ");
    Some(format!("note: plans usually have {usual} semesters"))
}

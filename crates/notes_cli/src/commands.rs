use std::fs;
use std::io::{self, Write};

use anyhow::{Context, Result, bail};
use assist::{CompletionProvider, NoteAssistant, TRANSLATION_LANGUAGES};
use core_types::{Note, NoteId, contains_tag, preview};
use note_storage::KeyValueStorage;
use note_store::{NoteSession, Selection, matches_query};
use tracing::info;

use crate::cli::{AssistAction, Command};

const SHORT_ID_LEN: usize = 8;

/// Runs one subcommand against the session, writing human output to `out`.
/// `assistant` is required only by `assist` actions that call a model.
pub fn run<S: KeyValueStorage, P: CompletionProvider>(
    session: &mut NoteSession<S>,
    command: Command,
    assistant: Option<&NoteAssistant<P>>,
    out: &mut impl Write,
) -> Result<()> {
    match command {
        Command::New { title, content } => {
            let id = session.create_note();
            if let Some(title) = title {
                session.edit_title(title)?;
            }
            if let Some(content) = content {
                session.edit_content(content)?;
            }
            writeln!(out, "{id}")?;
        }
        Command::List { query, sort, tag } => {
            let sort_by = sort
                .map(Into::into)
                .unwrap_or_else(|| session.store().preferences().sort_by);
            let store = session.store();
            let notes = store.sorted_by(sort_by);
            for note in notes.into_iter().filter(|note| {
                query.as_deref().is_none_or(|query| matches_query(note, query))
                    && tag.as_deref().is_none_or(|tag| contains_tag(&note.tags, tag))
            }) {
                writeln!(out, "{}", list_line(note))?;
            }
        }
        Command::Show { id, password } => {
            let id = open(session, &id, password.as_deref())?;
            let note = session
                .store()
                .get(&id)
                .with_context(|| format!("note {id} disappeared"))?;
            let view = session.view(note);
            writeln!(out, "# {}", note.title)?;
            writeln!(out, "id:      {}", note.id)?;
            writeln!(out, "created: {}", note.created_at.to_rfc3339())?;
            writeln!(out, "updated: {}", note.updated_at.to_rfc3339())?;
            if !note.tags.is_empty() {
                writeln!(out, "tags:    {}", note.tags.join(", "))?;
            }
            writeln!(out)?;
            match view.content {
                Some(content) => writeln!(out, "{content}")?,
                None => writeln!(out, "[locked]")?,
            }
        }
        Command::Title {
            id,
            title,
            password,
        } => {
            open(session, &id, password.as_deref())?;
            report(out, session.edit_title(title)?, "title updated")?;
        }
        Command::Write { id, content } => {
            open(session, &id, None)?;
            let content = if content == "-" {
                io::read_to_string(io::stdin()).context("failed to read content from stdin")?
            } else {
                content
            };
            report(out, session.edit_content(content)?, "content updated")?;
        }
        Command::Delete { id } => {
            let id = resolve_id(session, &id)?;
            session.store_mut().delete(&id);
            writeln!(out, "deleted {id}")?;
        }
        Command::Pin { id } => {
            let id = resolve_id(session, &id)?;
            session.store_mut().toggle_pin(&id);
            let pinned = session.store().get(&id).is_some_and(|note| note.is_pinned);
            writeln!(out, "{}", if pinned { "pinned" } else { "unpinned" })?;
        }
        Command::Tag { id, tags, password } => {
            open(session, &id, password.as_deref())?;
            report(out, session.add_tags(tags)?, "tags added")?;
        }
        Command::Untag { id, tag, password } => {
            open(session, &id, password.as_deref())?;
            report(out, session.remove_tag(&tag)?, "tag removed")?;
        }
        Command::Lock {
            id,
            password,
            confirm,
        } => {
            let id = resolve_id(session, &id)?;
            session.lock(&id, &password, &confirm)?;
            writeln!(out, "locked {id}")?;
        }
        Command::Unlock { id, password } => {
            let id = resolve_id(session, &id)?;
            session.remove_lock(&id, &password)?;
            writeln!(out, "unlocked {id}")?;
        }
        Command::Grammar {
            id,
            fix,
            apply,
            highlight,
        } => {
            let content = revealed_content(session, &id, None)?;
            let issues = grammar::check(&content);
            for (index, issue) in issues.iter().enumerate() {
                writeln!(
                    out,
                    "{:>3}. {:>6}  {:<12} {:?} -> {:?}",
                    index + 1,
                    issue.position,
                    issue.kind.as_str(),
                    issue.error,
                    issue.correction
                )?;
            }
            let stats = grammar::stats(&issues);
            writeln!(
                out,
                "{} issue(s): {} spelling, {} grammar, {} punctuation, {} spacing",
                stats.total, stats.spelling, stats.grammar, stats.punctuation, stats.spacing
            )?;
            if highlight {
                writeln!(out, "{}", grammar::highlight(&content, &issues))?;
            }
            if fix && !issues.is_empty() {
                let changed = session.edit_content(grammar::correct_all(&content))?;
                info!(issues = issues.len(), "grammar corrections applied");
                report(out, changed, "corrections applied")?;
            }
            if let Some(number) = apply {
                let issue = number
                    .checked_sub(1)
                    .and_then(|index| issues.get(index))
                    .with_context(|| format!("no issue number {number}"))?;
                let changed = session.edit_content(grammar::apply_correction(&content, issue))?;
                report(out, changed, "correction applied")?;
            }
        }
        Command::Assist { action } => {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .context("failed to create tokio runtime")?;
            runtime.block_on(run_assist(session, assistant, action, out))?;
        }
        Command::Export { path } => {
            let json = session
                .store()
                .export_json()
                .context("failed to serialize notes")?;
            match path {
                Some(path) => {
                    fs::write(&path, json)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    writeln!(
                        out,
                        "exported {} note(s) to {}",
                        session.store().len(),
                        path.display()
                    )?;
                }
                None => writeln!(out, "{json}")?,
            }
        }
        Command::Import { path } => {
            let text = fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let report = session
                .store_mut()
                .import_json(&text)
                .with_context(|| format!("failed to import {}", path.display()))?;
            writeln!(out, "imported {}, skipped {}", report.imported, report.skipped)?;
        }
        Command::Prefs { theme, view, sort } => {
            let store = session.store();
            let mut prefs = store.preferences();
            let changed = theme.is_some() || view.is_some() || sort.is_some();
            if let Some(theme) = theme {
                prefs.theme = theme.into();
            }
            if let Some(view) = view {
                prefs.default_view = view.into();
            }
            if let Some(sort) = sort {
                prefs.sort_by = sort.into();
            }
            if changed {
                store
                    .save_preferences(&prefs)
                    .context("failed to save preferences")?;
            }
            writeln!(out, "theme: {:?}", prefs.theme)?;
            writeln!(out, "view:  {:?}", prefs.default_view)?;
            writeln!(out, "sort:  {:?}", prefs.sort_by)?;
        }
        Command::Stats => {
            let store = session.store();
            let stats = store.stats();
            writeln!(
                out,
                "{} note(s), {} pinned, {} locked, {} tag(s)",
                stats.total, stats.pinned, stats.locked, stats.unique_tags
            )?;
            for (tag, count) in store.tag_counts() {
                writeln!(out, "  {tag}: {count}")?;
            }
        }
    }

    let store = session.store();
    if store.has_unsaved_changes() || store.storage().is_degraded() {
        bail!("changes could not be saved to storage; see the log for details");
    }
    Ok(())
}

async fn run_assist<S: KeyValueStorage, P: CompletionProvider>(
    session: &mut NoteSession<S>,
    assistant: Option<&NoteAssistant<P>>,
    action: AssistAction,
    out: &mut impl Write,
) -> Result<()> {
    if let AssistAction::Languages = action {
        for language in TRANSLATION_LANGUAGES {
            writeln!(out, "{language}")?;
        }
        return Ok(());
    }
    let Some(assistant) = assistant else {
        bail!("no completion command configured; set assist.command in config.json");
    };
    match action {
        AssistAction::Summarize { id, password } => {
            let content = revealed_content(session, &id, password.as_deref())?;
            writeln!(out, "{}", assistant.summarize(&content).await?)?;
        }
        AssistAction::Tags {
            id,
            apply,
            password,
        } => {
            let content = revealed_content(session, &id, password.as_deref())?;
            let existing = session
                .current()
                .map(|view| view.note.tags.clone())
                .unwrap_or_default();
            let tags = assistant.suggest_new_tags(&content, &existing).await?;
            if tags.is_empty() {
                writeln!(out, "no new tags")?;
                return Ok(());
            }
            writeln!(out, "{}", tags.join(", "))?;
            if apply {
                report(out, session.add_tags(tags)?, "tags added")?;
            }
        }
        AssistAction::Glossary { id, password } => {
            let content = revealed_content(session, &id, password.as_deref())?;
            for term in assistant.extract_glossary(&content).await? {
                writeln!(out, "{}: {}", term.term, term.definition)?;
            }
        }
        AssistAction::Grammar { id, password } => {
            let content = revealed_content(session, &id, password.as_deref())?;
            for suggestion in assistant.check_grammar(&content).await? {
                writeln!(
                    out,
                    "{:<12} {:?} -> {:?}",
                    suggestion.kind, suggestion.error, suggestion.correction
                )?;
            }
        }
        AssistAction::Translate {
            id,
            language,
            password,
        } => {
            let content = revealed_content(session, &id, password.as_deref())?;
            writeln!(out, "{}", assistant.translate(&content, &language).await?)?;
        }
        AssistAction::Insights { id, password } => {
            let content = revealed_content(session, &id, password.as_deref())?;
            let insights = assistant.insights(&content).await?;
            let json =
                serde_json::to_string_pretty(&insights).context("failed to format insights")?;
            writeln!(out, "{json}")?;
        }
        AssistAction::Languages => {}
    }
    Ok(())
}

/// Resolves `raw` to a full id: an exact match, or a unique prefix.
pub fn resolve_id<S: KeyValueStorage>(session: &NoteSession<S>, raw: &str) -> Result<NoteId> {
    let notes = session.store().notes();
    if let Some(note) = notes.iter().find(|note| note.id.as_str() == raw) {
        return Ok(note.id.clone());
    }
    if raw.is_empty() {
        bail!("note id is empty");
    }
    let mut matches = notes.iter().filter(|note| note.id.as_str().starts_with(raw));
    match (matches.next(), matches.next()) {
        (Some(note), None) => Ok(note.id.clone()),
        (None, _) => bail!("no note matches `{raw}`"),
        (Some(_), Some(_)) => bail!("`{raw}` matches more than one note"),
    }
}

/// Selects the note, revealing it with `password` when it is locked.
fn open<S: KeyValueStorage>(
    session: &mut NoteSession<S>,
    raw: &str,
    password: Option<&str>,
) -> Result<NoteId> {
    let id = resolve_id(session, raw)?;
    match session.select(&id) {
        Selection::Opened => {}
        Selection::PasswordRequired => match password {
            Some(password) => session.unlock(&id, password)?,
            None => bail!("note {id} is locked; pass --password"),
        },
        Selection::Missing => bail!("no note matches `{raw}`"),
    }
    Ok(id)
}

/// Opens the note and returns the content the session may show.
fn revealed_content<S: KeyValueStorage>(
    session: &mut NoteSession<S>,
    raw: &str,
    password: Option<&str>,
) -> Result<String> {
    let id = open(session, raw, password)?;
    session
        .current()
        .and_then(|view| view.content)
        .map(str::to_owned)
        .with_context(|| format!("note {id} is locked"))
}

fn report(out: &mut impl Write, changed: bool, message: &str) -> Result<()> {
    if changed {
        writeln!(out, "{message}")?;
    } else {
        writeln!(out, "nothing changed")?;
    }
    Ok(())
}

fn list_line(note: &Note) -> String {
    let id: String = note.id.as_str().chars().take(SHORT_ID_LEN).collect();
    let pin = if note.is_pinned { '*' } else { ' ' };
    let excerpt = if note.is_locked {
        "[locked]".to_owned()
    } else {
        preview(&note.content)
    };
    let tags = if note.tags.is_empty() {
        String::new()
    } else {
        format!(" [{}]", note.tags.join(", "))
    };
    format!("{id} {pin} {}{tags}  {excerpt}", note.title)
}

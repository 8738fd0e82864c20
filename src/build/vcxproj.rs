// src/build/vcxproj.rs
// Targeted patch of the RuntimeLibrary setting in a generated .vcxproj

use std::fs;
use std::io::Cursor;
use std::path::Path;

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::errors::{AgentError, AgentResult};
use crate::logger::RunLogger;

fn attr_value(e: &BytesStart, name: &str) -> Option<String> {
    e.try_get_attribute(name)
        .ok()
        .flatten()
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

fn write_runtime_element(writer: &mut Writer<Cursor<Vec<u8>>>, runtime: &str) -> AgentResult<()> {
    writer
        .write_event(Event::Start(BytesStart::new("RuntimeLibrary")))
        .and_then(|_| writer.write_event(Event::Text(BytesText::new(runtime))))
        .and_then(|_| writer.write_event(Event::End(BytesEnd::new("RuntimeLibrary"))))
        .map_err(|e| AgentError::ProjectPatchFailed {
            path: Path::new("").to_path_buf(),
            reason: e.to_string(),
        })
}

/// Rewrite the project XML, forcing `RuntimeLibrary` to `runtime` in every
/// Release configuration block.
///
/// Two kinds of block are patched, creating the element when absent:
/// `PropertyGroup[@Label="Configuration"]` whose `Condition` contains
/// "Release", and the `ClCompile` item definition of any
/// `ItemDefinitionGroup` whose `Condition` contains "Release". Everything
/// else passes through untouched, so the patch is idempotent.
pub fn rewrite_runtime_library(content: &str, runtime: &str) -> AgentResult<(String, usize)> {
    let mut reader = Reader::from_str(content);
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    let patch_err = |reason: String| AgentError::ProjectPatchFailed {
        path: Path::new("").to_path_buf(),
        reason,
    };

    let mut in_release_propgroup = false;
    let mut propgroup_has_runtime = false;
    let mut in_release_itemdef = false;
    let mut itemdef_has_clcompile = false;
    let mut in_clcompile = false;
    let mut clcompile_has_runtime = false;
    let mut skip_runtime_text = false;
    let mut modified = 0usize;

    loop {
        let event = reader.read_event().map_err(|e| patch_err(e.to_string()))?;
        match event {
            Event::Eof => break,
            Event::Start(ref e) => {
                match e.name().as_ref() {
                    b"PropertyGroup" => {
                        let label = attr_value(e, "Label").unwrap_or_default();
                        let condition = attr_value(e, "Condition").unwrap_or_default();
                        if label == "Configuration" && condition.contains("Release") {
                            in_release_propgroup = true;
                            propgroup_has_runtime = false;
                        }
                    }
                    b"ItemDefinitionGroup" => {
                        let condition = attr_value(e, "Condition").unwrap_or_default();
                        if condition.contains("Release") {
                            in_release_itemdef = true;
                            itemdef_has_clcompile = false;
                        }
                    }
                    b"ClCompile" if in_release_itemdef => {
                        in_clcompile = true;
                        clcompile_has_runtime = false;
                        itemdef_has_clcompile = true;
                    }
                    b"RuntimeLibrary" if in_release_propgroup || in_clcompile => {
                        // Replace the element's text wholesale.
                        if in_clcompile {
                            clcompile_has_runtime = true;
                        } else {
                            propgroup_has_runtime = true;
                        }
                        modified += 1;
                        writer
                            .write_event(Event::Start(e.to_owned()))
                            .map_err(|e| patch_err(e.to_string()))?;
                        writer
                            .write_event(Event::Text(BytesText::new(runtime)))
                            .map_err(|e| patch_err(e.to_string()))?;
                        skip_runtime_text = true;
                        continue;
                    }
                    _ => {}
                }
                writer
                    .write_event(Event::Start(e.to_owned()))
                    .map_err(|e| patch_err(e.to_string()))?;
            }
            Event::Empty(ref e) => {
                if e.name().as_ref() == b"RuntimeLibrary" && (in_release_propgroup || in_clcompile) {
                    if in_clcompile {
                        clcompile_has_runtime = true;
                    } else {
                        propgroup_has_runtime = true;
                    }
                    modified += 1;
                    write_runtime_element(&mut writer, runtime)?;
                } else {
                    writer
                        .write_event(Event::Empty(e.to_owned()))
                        .map_err(|e| patch_err(e.to_string()))?;
                }
            }
            Event::Text(ref t) => {
                if skip_runtime_text && !t.iter().all(|b| b.is_ascii_whitespace()) {
                    // Old RuntimeLibrary value, already replaced.
                    continue;
                }
                writer
                    .write_event(Event::Text(t.to_owned()))
                    .map_err(|e| patch_err(e.to_string()))?;
            }
            Event::End(ref e) => {
                match e.name().as_ref() {
                    b"RuntimeLibrary" => {
                        skip_runtime_text = false;
                    }
                    b"ClCompile" if in_clcompile => {
                        if !clcompile_has_runtime {
                            write_runtime_element(&mut writer, runtime)?;
                            modified += 1;
                        }
                        in_clcompile = false;
                    }
                    b"ItemDefinitionGroup" if in_release_itemdef => {
                        if !itemdef_has_clcompile {
                            writer
                                .write_event(Event::Start(BytesStart::new("ClCompile")))
                                .map_err(|e| patch_err(e.to_string()))?;
                            write_runtime_element(&mut writer, runtime)?;
                            writer
                                .write_event(Event::End(BytesEnd::new("ClCompile")))
                                .map_err(|e| patch_err(e.to_string()))?;
                            modified += 1;
                        }
                        in_release_itemdef = false;
                    }
                    b"PropertyGroup" if in_release_propgroup => {
                        if !propgroup_has_runtime {
                            write_runtime_element(&mut writer, runtime)?;
                            modified += 1;
                        }
                        in_release_propgroup = false;
                    }
                    _ => {}
                }
                writer
                    .write_event(Event::End(e.to_owned()))
                    .map_err(|e| patch_err(e.to_string()))?;
            }
            other => {
                writer
                    .write_event(other)
                    .map_err(|e| patch_err(e.to_string()))?;
            }
        }
    }

    let bytes = writer.into_inner().into_inner();
    let patched = String::from_utf8(bytes).map_err(|e| patch_err(e.to_string()))?;
    Ok((patched, modified))
}

/// Force the compiler runtime-linkage setting of every Release configuration
/// in a .vcxproj file. Returns true when at least one block was patched.
pub fn patch_runtime_library(
    logger: &RunLogger,
    vcxproj_path: &Path,
    runtime: &str,
    dry_run: bool,
) -> AgentResult<bool> {
    logger.section("Modifying Project Properties");
    logger.info(&format!("Project: {}", vcxproj_path.display()));
    logger.info(&format!("Setting Runtime Library to: {} (/MD)", runtime));

    if dry_run {
        logger.info("[DRY RUN] Would modify project properties");
        return Ok(true);
    }

    let content = fs::read_to_string(vcxproj_path).map_err(|e| AgentError::ProjectPatchFailed {
        path: vcxproj_path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let (patched, modified) =
        rewrite_runtime_library(&content, runtime).map_err(|e| AgentError::ProjectPatchFailed {
            path: vcxproj_path.to_path_buf(),
            reason: e.to_string(),
        })?;

    if modified > 0 {
        fs::write(vcxproj_path, patched)?;
        logger.info("✓ Project properties modified successfully");
        Ok(true)
    } else {
        logger.warn("⚠ No Release configuration found to modify");
        Ok(false)
    }
}

// src/config/validate.rs

use std::collections::HashMap;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::ConfigFile;
use crate::errors::{ExecdagError, Result};

pub fn validate_config(cfg: &ConfigFile) -> Result<()> {
    ensure_has_execs(cfg)?;
    validate_outputs(cfg)?;
    validate_environment_entries(cfg)?;
    validate_after_references(cfg)?;
    validate_dag(cfg)?;
    Ok(())
}

fn ensure_has_execs(cfg: &ConfigFile) -> Result<()> {
    if cfg.exec.is_empty() {
        return Err(ExecdagError::ConfigError(
            "config must contain at least one [exec.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_outputs(cfg: &ConfigFile) -> Result<()> {
    let mut seen: HashMap<&str, &str> = HashMap::new();
    for (name, section) in cfg.exec.iter() {
        if section.output.is_empty() {
            return Err(ExecdagError::ConfigError(format!(
                "exec '{name}' has an empty output path"
            )));
        }
        if let Some(other) = seen.insert(section.output.as_str(), name.as_str()) {
            return Err(ExecdagError::ConfigError(format!(
                "exec '{name}' and exec '{other}' both declare output '{}'",
                section.output
            )));
        }
    }
    Ok(())
}

fn validate_environment_entries(cfg: &ConfigFile) -> Result<()> {
    for (name, section) in cfg.exec.iter() {
        for entry in &section.environment {
            if !entry.contains('=') {
                return Err(ExecdagError::ConfigError(format!(
                    "exec '{name}': environment entry '{entry}' is not KEY=VALUE"
                )));
            }
        }
    }
    Ok(())
}

fn validate_after_references(cfg: &ConfigFile) -> Result<()> {
    for (name, section) in cfg.exec.iter() {
        for dep in section.after.iter() {
            if !cfg.exec.contains_key(dep) {
                return Err(ExecdagError::ConfigError(format!(
                    "exec '{name}' has unknown dependency '{dep}' in `after`"
                )));
            }
            if dep == name {
                return Err(ExecdagError::ConfigError(format!(
                    "exec '{name}' cannot depend on itself in `after`"
                )));
            }
        }
    }
    Ok(())
}

fn validate_dag(cfg: &ConfigFile) -> Result<()> {
    // Edge direction: dep -> node. For:
    //   [exec.B]
    //   after = ["A"]
    // we add edge A -> B.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.exec.keys() {
        graph.add_node(name.as_str());
    }

    for (name, section) in cfg.exec.iter() {
        for dep in section.after.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    // A topological sort will fail if there is a cycle.
    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => {
            let node = cycle.node_id();
            Err(ExecdagError::GraphCycle(format!(
                "cycle detected in `after` dependencies involving exec '{node}'"
            )))
        }
    }
}

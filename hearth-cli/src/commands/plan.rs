//! `hearth plan` - show the bootstrap order without activating anything

use anyhow::Result;
use hearth_core::{ActivationPlan, KernelConfig, PluginInfo};

use crate::demo;

pub fn run(config: KernelConfig) -> Result<()> {
    let app = demo::application(config)?;
    let plan = app.plan()?;
    print!("{}", format_plan(&plan, &app.list_plugins()));
    Ok(())
}

fn format_plan(plan: &ActivationPlan, plugins: &[PluginInfo]) -> String {
    let mut out = String::from("Activation order:\n");
    for (i, id) in plan.order.iter().enumerate() {
        let provides = plugins
            .iter()
            .find(|info| &info.id == id)
            .and_then(|info| info.manifest.provides.as_deref());
        out.push_str(&format!("  {:>2}. {id}", i + 1));
        if let Some(capability) = provides {
            out.push_str(&format!(" (provides {capability})"));
        }
        out.push('\n');
    }

    if !plan.unresolved.is_empty() {
        out.push_str("\nUnresolved:\n");
        for unresolved in &plan.unresolved {
            out.push_str(&format!(
                "  ✗ {} needs {}\n",
                unresolved.plugin, unresolved.capability
            ));
        }
    }

    let on_demand: Vec<&str> = plugins
        .iter()
        .filter(|info| !plan.contains(&info.id))
        .filter(|info| !plan.unresolved.iter().any(|u| u.plugin == info.id))
        .map(|info| info.id.as_str())
        .collect();
    if !on_demand.is_empty() {
        out.push_str("\nNot activated at startup:\n");
        for id in on_demand {
            out.push_str(&format!("  ○ {id}\n"));
        }
    }
    out
}

//! Task bookkeeping: `addtask`/`deltask` and the task list handed to schedulers.
//!
//! Tasks are kept in `__BBTASKS` (declaration order, no duplicates). A task's predecessors
//! live in its `deps` flag; `before` constraints are recorded as `deps` on the other task.
use bakeweave_datasmart::{DataSmart, VariableContents};
use indexmap::IndexMap;

use crate::BakeweaveResult;
use crate::utils::{list_flag, list_var};

pub const TASKS_VAR: &str = "__BBTASKS";

fn task_name(task: &str) -> String {
    match task.starts_with("do_") {
        true => task.to_string(),
        false => format!("do_{task}"),
    }
}

pub fn add_task<B: AsRef<str>, A: AsRef<str>>(
    task: &str,
    before: &[B],
    after: &[A],
    d: &mut DataSmart,
) -> BakeweaveResult<()> {
    let task = task_name(task);
    d.set_var_flag(&task, "task", 1i64);

    let mut tasks = list_var(d, TASKS_VAR)?;
    if !tasks.contains(&task) {
        tasks.push(task.clone());
    }
    d.set_var(TASKS_VAR, VariableContents::List(tasks))?;

    let mut deps = list_flag(d, &task, "deps")?;
    for entry in after {
        let entry = entry.as_ref();
        if !deps.iter().any(|dep| dep == entry) {
            deps.push(entry.to_string());
        }
    }
    d.set_var_flag(&task, "deps", VariableContents::List(deps));

    for entry in before {
        let entry = entry.as_ref();
        let existing = list_flag(d, entry, "deps")?;
        if !existing.contains(&task) {
            let deps = std::iter::once(task.clone()).chain(existing).collect();
            d.set_var_flag(entry, "deps", VariableContents::List(deps));
        }
    }

    Ok(())
}

/// Removes `task` from the task list and from the `deps` of every remaining task. Deleting a task
/// that was never added is not an error.
pub fn del_task(task: &str, d: &mut DataSmart) -> BakeweaveResult<()> {
    let task = task_name(task);

    let mut tasks = list_var(d, TASKS_VAR)?;
    if let Some(pos) = tasks.iter().position(|t| *t == task) {
        tasks.remove(pos);
        d.del_var_flag(&task, "task");
        d.set_var(TASKS_VAR, VariableContents::List(tasks.clone()))?;
    }

    d.del_var_flag(&task, "deps");
    for other in tasks {
        let mut deps = list_flag(d, &other, "deps")?;
        if let Some(pos) = deps.iter().position(|dep| *dep == task) {
            deps.remove(pos);
            d.set_var_flag(&other, "deps", VariableContents::List(deps));
        }
    }

    Ok(())
}

/// Finalisation step: every listed task (after expansion) is flagged `task=1`.
pub fn add_tasks(d: &mut DataSmart) -> BakeweaveResult<()> {
    for task in list_var(d, TASKS_VAR)? {
        let task = d.expand(&task)?;
        d.set_var_flag(task, "task", 1i64);
    }

    Ok(())
}

/// Each task with the predecessors that are themselves declared tasks. Constraints naming a
/// task that does not exist (any more) are dropped.
pub fn task_dependencies(d: &DataSmart) -> BakeweaveResult<IndexMap<String, Vec<String>>> {
    let tasks = list_var(d, TASKS_VAR)?;
    let mut ret = IndexMap::new();
    for task in &tasks {
        let deps = list_flag(d, task, "deps")?
            .into_iter()
            .filter(|dep| tasks.contains(dep))
            .collect();
        ret.insert(task.clone(), deps);
    }

    Ok(ret)
}

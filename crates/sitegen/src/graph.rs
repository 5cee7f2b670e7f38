use crate::error::{Result, SitegenError};
use futures_util::future::BoxFuture;
use futures_util::stream::{FuturesUnordered, StreamExt};
use futures_util::FutureExt;
use log::{debug, error};
use std::collections::{HashMap, HashSet, VecDeque};
use std::future::Future;

pub type TaskFuture<A> = BoxFuture<'static, Result<A>>;

type TaskFn<A> = Box<dyn FnOnce(Inputs<A>) -> TaskFuture<A> + Send>;

/// Outputs of a task's declared predecessors.
#[derive(Debug)]
pub struct Inputs<A> {
    outputs: HashMap<&'static str, A>,
}

impl<A> Inputs<A> {
    pub fn get(&self, task: &str) -> Option<&A> {
        self.outputs.get(task)
    }
}

struct Task<A> {
    name: &'static str,
    dependencies: Vec<&'static str>,
    run: TaskFn<A>,
}

/// A directed acyclic graph of named asynchronous tasks.
///
/// Each task starts on the tokio runtime as soon as all of its
/// predecessors have succeeded and receives their outputs. Tasks without a
/// path between them run concurrently. The first failure ends the run;
/// tasks already in flight are left to finish on their own.
pub struct TaskGraph<A> {
    tasks: Vec<Task<A>>,
}

impl<A> Default for TaskGraph<A> {
    fn default() -> Self {
        Self { tasks: Vec::new() }
    }
}

impl<A: Clone + Send + 'static> TaskGraph<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<F, Fut>(&mut self, name: &'static str, dependencies: &[&'static str], run: F) -> &mut Self
    where
        F: FnOnce(Inputs<A>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<A>> + Send + 'static,
    {
        self.tasks.push(Task {
            name,
            dependencies: dependencies.to_vec(),
            run: Box::new(move |inputs| run(inputs).boxed()),
        });
        self
    }

    /// Checks for duplicate names, unknown dependencies and cycles.
    pub fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        for task in &self.tasks {
            if !names.insert(task.name) {
                return Err(SitegenError::DuplicateTask {
                    task: task.name.to_string(),
                });
            }
        }

        for task in &self.tasks {
            if let Some(dependency) = task
                .dependencies
                .iter()
                .find(|dependency| !names.contains(*dependency))
            {
                return Err(SitegenError::UnknownDependency {
                    task: task.name.to_string(),
                    dependency: dependency.to_string(),
                });
            }
        }

        let mut remaining: HashMap<&'static str, usize> = self
            .tasks
            .iter()
            .map(|task| (task.name, task.dependencies.len()))
            .collect();
        let mut ready: VecDeque<&'static str> = remaining
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(name, _)| *name)
            .collect();

        while let Some(done) = ready.pop_front() {
            remaining.remove(done);
            for task in &self.tasks {
                if task.dependencies.contains(&done)
                    && let Some(count) = remaining.get_mut(task.name)
                {
                    *count -= 1;
                    if *count == 0 {
                        ready.push_back(task.name);
                    }
                }
            }
        }

        if !remaining.is_empty() {
            let mut tasks: Vec<String> = remaining.keys().map(|name| name.to_string()).collect();
            tasks.sort();
            return Err(SitegenError::DependencyCycle { tasks });
        }

        Ok(())
    }

    /// Runs every task and returns all outputs keyed by task name.
    pub async fn run(self) -> Result<HashMap<&'static str, A>> {
        self.validate()?;

        let mut pending = self.tasks;
        let mut outputs: HashMap<&'static str, A> = HashMap::new();
        let mut running = FuturesUnordered::new();

        loop {
            let (ready, waiting): (Vec<_>, Vec<_>) = pending.into_iter().partition(|task| {
                task.dependencies
                    .iter()
                    .all(|dependency| outputs.contains_key(dependency))
            });
            pending = waiting;

            for task in ready {
                let inputs = Inputs {
                    outputs: task
                        .dependencies
                        .iter()
                        .filter_map(|dependency| {
                            outputs.get(dependency).map(|output| (*dependency, output.clone()))
                        })
                        .collect(),
                };
                debug!("Starting task '{}'", task.name);
                let name = task.name;
                let handle = tokio::spawn((task.run)(inputs));
                running.push(async move { (name, handle.await) });
            }

            let Some((name, joined)) = running.next().await else {
                break;
            };

            match joined {
                Ok(Ok(output)) => {
                    debug!("Finished task '{}'", name);
                    outputs.insert(name, output);
                }
                Ok(Err(failure)) => {
                    error!("Task '{}' failed: {}", name, failure);
                    return Err(failure);
                }
                Err(join_error) => {
                    return Err(SitegenError::TaskPanicked {
                        task: name.to_string(),
                        message: join_error.to_string(),
                    });
                }
            }
        }

        Ok(outputs)
    }
}

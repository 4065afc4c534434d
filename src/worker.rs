//! The single background consumer of the task queue.

use tracing::info;

use crate::notify::Notify;
use crate::pipeline::Pipeline;
use crate::process::CommandRunner;
use crate::queue::TaskReceiver;

/// Drain `tasks` one at a time until every sender is gone.
///
/// A failed task never stops the loop; [`Pipeline::process`] contains it.
/// Returns the number of tasks that completed successfully.
pub async fn run_worker<R, N>(pipeline: Pipeline<R, N>, mut tasks: TaskReceiver) -> usize
where
    R: CommandRunner,
    N: Notify,
{
    info!("Pipeline worker started");
    let mut completed = 0;
    while let Some(task) = tasks.next().await {
        info!("Received task {} ({} more waiting)", task.id, tasks.pending());
        if pipeline.process(task).await.is_some() {
            completed += 1;
        }
    }
    info!("Task queue closed; pipeline worker exiting");
    completed
}

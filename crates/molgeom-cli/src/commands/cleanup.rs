use crate::cli::CleanupArgs;
use crate::error::Result;
use crate::job::{CleanupJob, CleanupReport};
use crate::utils::progress::CliProgressHandler;
use molgeom::{engine::progress::ProgressReporter, workflows};
use tracing::{info, warn};

pub fn run(args: CleanupArgs) -> Result<()> {
    let job = CleanupJob::from_file(&args.job)?;
    info!("Merging cleanup settings from job file and CLI arguments...");
    let config = job.merge_with_cli(&args)?;
    let input = job.into_input()?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Starting geometry cleanup...");
    info!("Invoking the core cleanup workflow...");
    let result = workflows::cleanup::run(input, &config, &reporter)?;

    if result.flipped {
        println!("Starting structure was mirrored to match the chirality constraints.");
    }
    if !result.converged {
        warn!(
            "Cleanup stopped after {} iterations without converging.",
            result.iterations
        );
        println!("Warning: cleanup did not converge; writing the last coordinates.");
    }

    CleanupReport::from(&result).write_to(&args.output)?;
    println!(
        "✓ Refined coordinates (error: {:.6}) written to: {}",
        result.error,
        args.output.display()
    );

    Ok(())
}

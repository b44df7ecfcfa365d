//! Example: Mount an empty memfs at a directory.
//!
//! Usage:
//!   cargo run -p memfs-fuse --example mount_memfs -- <mountpoint> [options]
//!
//! Options:
//!   --allow-other        Let other users access the mount
//!   --no-auto-unmount    Keep the mount registered if the process dies
//!
//! Everything created under the mountpoint lives in process memory and
//! disappears when the tool exits.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use fuser::MountOption;
use memfs_fuse::MemFs;

/// CLI arguments for the mount_memfs example.
struct CliArgs {
    mountpoint: PathBuf,
    allow_other: bool,
    auto_unmount: bool,
}

impl CliArgs {
    /// Parse CLI arguments.
    ///
    /// # Returns
    /// Parsed CLI arguments or None if help was requested or args invalid.
    fn parse() -> Option<Self> {
        let args: Vec<String> = std::env::args().collect();

        if args.len() < 2 || args.iter().any(|a| a == "--help" || a == "-h") {
            Self::print_usage(&args[0]);
            return None;
        }

        let mut mountpoint: Option<PathBuf> = None;
        let mut allow_other: bool = false;
        let mut auto_unmount: bool = true;

        for arg in &args[1..] {
            match arg.as_str() {
                "--allow-other" => allow_other = true,
                "--no-auto-unmount" => auto_unmount = false,
                a if !a.starts_with('-') => {
                    if mountpoint.is_none() {
                        mountpoint = Some(PathBuf::from(a));
                    }
                }
                _ => {
                    eprintln!("Unknown option: {}", arg);
                    Self::print_usage(&args[0]);
                    return None;
                }
            }
        }

        Some(Self {
            mountpoint: mountpoint?,
            allow_other,
            auto_unmount,
        })
    }

    /// Print usage information.
    ///
    /// # Arguments
    /// * `program` - Program name for usage message
    fn print_usage(program: &str) {
        eprintln!("Usage: {} <mountpoint> [options]", program);
        eprintln!();
        eprintln!("Options:");
        eprintln!("  --allow-other        Let other users access the mount");
        eprintln!("  --no-auto-unmount    Keep the mount registered if the process dies");
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let args: CliArgs = match CliArgs::parse() {
        Some(a) => a,
        None => std::process::exit(1),
    };

    if !args.mountpoint.exists() {
        std::fs::create_dir_all(&args.mountpoint)?;
    }

    let mut options: Vec<MountOption> = vec![MountOption::FSName("memfs".to_string())];
    if args.auto_unmount {
        options.push(MountOption::AutoUnmount);
    }
    if args.allow_other {
        options.push(MountOption::AllowOther);
    }

    let running: Arc<AtomicBool> = Arc::new(AtomicBool::new(true));
    let r: Arc<AtomicBool> = running.clone();
    ctrlc::set_handler(move || {
        println!("\nReceived SIGINT, unmounting...");
        r.store(false, Ordering::SeqCst);
    })?;

    println!("Mounting memfs at: {}", args.mountpoint.display());
    let session = memfs_fuse::spawn_mount(MemFs::new(), &args.mountpoint, &options)?;
    println!("Press Ctrl+C to unmount and exit.");

    while running.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(100));
    }

    drop(session);
    println!("Unmounted successfully.");

    Ok(())
}

//! Interactive shell for SimpleFS.
//!
//! Opens a backing image file and drops into a REPL that dispatches
//! each line to the filesystem API, the way a teaching shell built
//! around a disk image is expected to: one command per line, a
//! sentinel printed back, nothing more.

use std::fs::File;
use std::io::{self, BufRead, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, LevelFilter};

use simplefs::fs::{self, FileSystem};
use simplefs::Disk;

/// SimpleFS interactive shell.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the backing disk image (created if it does not exist).
    disk: PathBuf,

    /// Number of blocks in the disk image.
    blocks: u32,

    /// Enable info-level logging.
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug-level logging.
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug {
        LevelFilter::Debug
    } else if args.verbose {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    };
    env_logger::Builder::new().filter_level(log_level).init();

    let mut disk = Disk::open(&args.disk, args.blocks)
        .with_context(|| format!("failed to open disk image {}", args.disk.display()))?;

    info!("shell: opened {} ({} blocks)", args.disk.display(), args.blocks);
    println!(
        "SimpleFS shell — disk '{}', {} blocks. Type 'help' for commands.",
        args.disk.display(),
        args.blocks
    );

    let stdin = io::stdin();
    let mut fs: Option<FileSystem> = None;

    print!("simplefs> ");
    let _ = io::stdout().flush();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(_) => break,
        };
        let words: Vec<&str> = line.split_whitespace().collect();

        match words.as_slice() {
            [] => {}
            ["help"] => print_help(),
            ["quit"] | ["exit"] => break,

            ["format"] => {
                if fs.is_some() {
                    println!("format failed: unmount first");
                } else if fs::format(&mut disk) {
                    println!("disk formatted");
                } else {
                    println!("format failed");
                }
            }

            ["mount"] => {
                if fs.is_some() {
                    println!("mount failed: already mounted");
                } else {
                    match FileSystem::mount(&mut disk) {
                        Ok(mounted) => {
                            fs = Some(mounted);
                            println!("mounted");
                        }
                        Err(e) => println!("mount failed: {}", e),
                    }
                }
            }

            ["unmount"] => match fs.take() {
                Some(mounted) => {
                    mounted.unmount();
                    println!("unmounted");
                }
                None => println!("unmount failed: not mounted"),
            },

            ["debug"] => {
                if fs.is_some() {
                    println!("debug failed: unmount first");
                } else if let Err(e) = fs::debug(&mut disk) {
                    println!("debug failed: {}", e);
                }
            }

            ["create"] => match fs.as_mut() {
                Some(mounted) => {
                    let inode = mounted.create();
                    if inode < 0 {
                        println!("create failed: no free inode");
                    } else {
                        println!("created inode {}", inode);
                    }
                }
                None => println!("create failed: not mounted"),
            },

            ["remove", n] => with_mounted(&mut fs, |mounted| {
                match n.parse::<u32>() {
                    Ok(n) => {
                        if mounted.remove(n) {
                            println!("removed inode {}", n);
                        } else {
                            println!("remove failed");
                        }
                    }
                    Err(_) => println!("remove failed: bad inode number '{}'", n),
                }
            }),

            ["stat", n] => with_mounted(&mut fs, |mounted| match n.parse::<u32>() {
                Ok(n) => {
                    let size = mounted.stat(n);
                    if size < 0 {
                        println!("stat failed: no such inode");
                    } else {
                        println!("inode {} has size {} bytes", n, size);
                    }
                }
                Err(_) => println!("stat failed: bad inode number '{}'", n),
            }),

            ["cat", n] => with_mounted(&mut fs, |mounted| match n.parse::<u32>() {
                Ok(n) => cat(mounted, n),
                Err(_) => println!("cat failed: bad inode number '{}'", n),
            }),

            ["copyin", host, n] => {
                let host = host.to_string();
                with_mounted(&mut fs, |mounted| match n.parse::<u32>() {
                    Ok(n) => copyin(mounted, &host, n),
                    Err(_) => println!("copyin failed: bad inode number '{}'", n),
                })
            }

            ["copyout", n, host] => {
                let host = host.to_string();
                with_mounted(&mut fs, |mounted| match n.parse::<u32>() {
                    Ok(n) => copyout(mounted, n, &host),
                    Err(_) => println!("copyout failed: bad inode number '{}'", n),
                })
            }

            _ => println!("unknown command '{}' (try 'help')", line.trim()),
        }

        print!("simplefs> ");
        let _ = io::stdout().flush();
    }

    if let Some(mounted) = fs.take() {
        mounted.unmount();
    }

    Ok(())
}

fn with_mounted(fs: &mut Option<FileSystem>, op: impl FnOnce(&mut FileSystem)) {
    match fs.as_mut() {
        Some(mounted) => op(mounted),
        None => println!("failed: not mounted"),
    }
}

const CHUNK: usize = 4096;

fn cat(fs: &mut FileSystem, inode: u32) {
    let size = fs.stat(inode);
    if size < 0 {
        println!("cat failed: no such inode");
        return;
    }

    let mut offset = 0usize;
    let size = size as usize;
    let mut buf = vec![0u8; CHUNK];
    let stdout = io::stdout();
    let mut handle = stdout.lock();

    while offset < size {
        let to_read = std::cmp::min(CHUNK, size - offset);
        let n = fs.read(inode, &mut buf[..to_read], to_read, offset);
        if n < 0 {
            println!("\ncat failed: read error at offset {}", offset);
            return;
        }
        if n == 0 {
            break;
        }
        let _ = handle.write_all(&buf[..n as usize]);
        offset += n as usize;
    }
    let _ = handle.write_all(b"\n");
}

fn copyin(fs: &mut FileSystem, host_path: &str, inode: u32) {
    let mut host_file = match File::open(host_path) {
        Ok(f) => f,
        Err(e) => {
            println!("copyin failed: {}", e);
            return;
        }
    };

    let mut offset = 0usize;
    let mut buf = vec![0u8; CHUNK];
    loop {
        let n = match host_file.read(&mut buf) {
            Ok(n) => n,
            Err(e) => {
                println!("copyin failed: {}", e);
                return;
            }
        };
        if n == 0 {
            break;
        }
        let written = fs.write(inode, &buf[..n], n, offset);
        if written < 0 {
            println!("copyin failed: write error at offset {}", offset);
            return;
        }
        offset += written as usize;
        if (written as usize) < n {
            println!("copyin: disk full after {} bytes", offset);
            break;
        }
    }
    println!("copied {} bytes into inode {}", offset, inode);
}

fn copyout(fs: &mut FileSystem, inode: u32, host_path: &str) {
    let size = fs.stat(inode);
    if size < 0 {
        println!("copyout failed: no such inode");
        return;
    }

    let mut host_file = match File::create(host_path) {
        Ok(f) => f,
        Err(e) => {
            println!("copyout failed: {}", e);
            return;
        }
    };

    let size = size as usize;
    let mut offset = 0usize;
    let mut buf = vec![0u8; CHUNK];
    while offset < size {
        let to_read = std::cmp::min(CHUNK, size - offset);
        let n = fs.read(inode, &mut buf[..to_read], to_read, offset);
        if n < 0 {
            println!("copyout failed: read error at offset {}", offset);
            return;
        }
        if n == 0 {
            break;
        }
        if let Err(e) = host_file.write_all(&buf[..n as usize]) {
            println!("copyout failed: {}", e);
            return;
        }
        offset += n as usize;
    }
    println!("copied {} bytes from inode {}", offset, inode);
}

fn print_help() {
    println!("Commands:");
    println!("    format                 format the disk image");
    println!("    mount                  mount the filesystem");
    println!("    unmount                unmount the filesystem");
    println!("    debug                  print the superblock and all valid inodes");
    println!("    create                 create a new inode");
    println!("    remove <n>             remove inode n");
    println!("    stat <n>               print the size of inode n");
    println!("    cat <n>                print the contents of inode n");
    println!("    copyin <host> <n>      copy a host file into inode n");
    println!("    copyout <n> <host>     copy inode n out to a host file");
    println!("    help                   print this message");
    println!("    quit, exit             leave the shell");
}

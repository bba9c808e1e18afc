use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;

#[derive(Args, Debug)]
pub struct ManArgs {
    /// Output directory (default: dist/share/man/man1)
    #[arg(long = "out-dir", default_value = "dist/share/man/man1")]
    pub out_dir: PathBuf,
}

fn render(cmd: clap::Command, title: &str, path: &Path) -> Result<(), String> {
    let mut buffer: Vec<u8> = Vec::new();
    clap_mangen::Man::new(cmd)
        .title(title)
        .render(&mut buffer)
        .map_err(|e| format!("render {}: {e}", path.display()))?;
    fs::write(path, buffer).map_err(|e| format!("{}: {e}", path.display()))?;
    println!("wrote {}", path.display());
    Ok(())
}

pub fn cmd_man(args: ManArgs) -> Result<(), String> {
    let out_dir = crate::workspace_root().join(args.out_dir);
    fs::create_dir_all(&out_dir).map_err(|e| format!("{}: {e}", out_dir.display()))?;

    let cmd = nextver::command();
    render(cmd.clone(), "nextver", &out_dir.join("nextver.1"))?;

    // Subcommand pages are titled `nextver-<name>` so `man nextver-next` works.
    for subcommand in cmd.get_subcommands() {
        let page = format!("nextver-{}", subcommand.get_name());
        render(subcommand.clone(), &page, &out_dir.join(format!("{page}.1")))?;
    }

    Ok(())
}

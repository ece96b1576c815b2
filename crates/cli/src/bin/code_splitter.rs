use anyhow::Result;

fn main() -> Result<()> {
    code_splitter_cli::main_entry()
}

use anyhow::Result;

fn main() -> Result<()> {
    shopstress::cli::execute()
}

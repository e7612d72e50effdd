use anyhow::Context;

fn main() -> anyhow::Result<()> {
    lens_edit::run().context("lens-edit failed")?;
    Ok(())
}

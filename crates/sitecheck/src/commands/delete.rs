use super::Workspace;

pub fn run(ws: &Workspace, id: &str) -> anyhow::Result<()> {
    ws.update(|store| Ok(store.delete(id)?))?;
    println!("Deleted {}", id);
    Ok(())
}

use fiflow_crawler::store::ArrowStore;

fn main() -> anyhow::Result<()> {
    let data_dir = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("FIFLOW_DATA_DIR").ok())
        .unwrap_or_else(|| "data".to_string());

    std::fs::create_dir_all(&data_dir)?;
    let store = ArrowStore::init(&data_dir)?;
    println!("成功创建空的存储文件: {}", store.market_path().display());
    Ok(())
}

use log_data_writers::{DataWriter, LogRow, SledLogStore, StoreDataWriter};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== 测试StoreDataWriter功能 ===");

    let store = Arc::new(SledLogStore::memory()?);
    let writer = StoreDataWriter::new(store);

    println!("\n1. 只读模式下插入");
    let rows = vec![LogRow::new("info", "started"), LogRow::new("debug", "loading config")];
    let echoed = writer.insert_rows(rows.clone(), &[]).await?;
    println!("返回 {} 行, 已存储 {} 行", echoed.len(), writer.get_rows().await?.len());

    println!("\n2. 关闭只读后插入");
    writer.set_read_only(false);
    writer.insert_rows(rows, &[]).await?;
    for row in writer.get_rows().await?.iter() {
        println!("{} [{}] {} ({})", row.time_stamp, row.level, row.message, row.color);
    }

    println!("\n3. 清空");
    writer.clear().await?;
    println!("清空后记录数: {}", writer.get_rows().await?.len());

    println!("\n=== 测试完成 ===");
    Ok(())
}

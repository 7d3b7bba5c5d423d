use bizsheet_core::StatusColor;
use bizsheet_core::reader::read_workbook;
use bizsheet_core::reader::parser_utils::cell_ref;
use std::env;

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <file.xlsx> [sheet]", args[0]);
        std::process::exit(1);
    }

    let path = &args[1];
    let workbook = read_workbook(path)?;

    println!("File: {}", path);
    println!("Sheets: {:?}", workbook.sheet_names());

    for sheet in &workbook.sheets {
        if let Some(only) = args.get(2)
            && *only != sheet.name
        {
            continue;
        }
        println!("\n=== Sheet: {} ===", sheet.name);

        for cell in sheet.all_cells() {
            let color = workbook.color_at(&sheet.name, cell.row, cell.col);
            if color == StatusColor::None {
                continue;
            }
            println!(
                "  {:<8} {:<10} {}",
                cell_ref(cell.row, cell.col),
                color.hex(),
                cell.value.as_text().replace('\n', " / ")
            );
        }
    }

    Ok(())
}

use clap::{arg,crate_version,Command};
use wad64::wad;

const RCH: &str = "unreachable was reached";

fn select(method: &str) -> wad::Codec {
    match method {
        "jaguar" => wad::Codec::Jaguar,
        _ => wad::Codec::D64
    }
}

fn main() -> Result<(),Box<dyn std::error::Error>>
{
    env_logger::init();

    let long_help =
"Examples:
---------
Expand a ROM archive:  `wad64 decompress -i doom64.wad -o expanded.wad`
Rebuild the ROM form:  `wad64 compress -i expanded.wad -o doom64.wad`
Align the lumps:       `wad64 pad -i expanded.wad -o padded.wad`
List the directory:    `wad64 list -i doom64.wad`";

    let methods = ["d64","jaguar"];

    let mut main_cmd = Command::new("wad64")
        .about("Compress and expand Doom 64 WAD archives")
        .after_long_help(long_help)
        .version(crate_version!());
    main_cmd = main_cmd.subcommand(Command::new("compress")
        .arg(arg!(-m --method <METHOD> "codec for flagged lumps").value_parser(methods)
            .required(false).default_value("d64"))
        .arg(arg!(-i --input <PATH> "input path").required(true))
        .arg(arg!(-o --output <PATH> "output path").required(true))
        .about("compress the lumps of an archive"));

    main_cmd = main_cmd.subcommand(Command::new("decompress")
        .arg(arg!(-m --method <METHOD> "codec for flagged lumps").value_parser(methods)
            .required(false).default_value("d64"))
        .arg(arg!(-i --input <PATH> "input path").required(true))
        .arg(arg!(-o --output <PATH> "output path").required(true))
        .about("expand the lumps of an archive"));

    main_cmd = main_cmd.subcommand(Command::new("pad")
        .arg(arg!(-i --input <PATH> "input path").required(true))
        .arg(arg!(-o --output <PATH> "output path").required(true))
        .about("start every lump on a four byte boundary"));

    main_cmd = main_cmd.subcommand(Command::new("list")
        .arg(arg!(-i --input <PATH> "input path").required(true))
        .about("list the lumps in an archive"));

    let matches = main_cmd.get_matches();

    if let Some(cmd) = matches.subcommand_matches("compress") {
        let path_in = cmd.get_one::<String>("input").expect(RCH);
        let path_out = cmd.get_one::<String>("output").expect(RCH);
        let method = cmd.get_one::<String>("method").expect(RCH);
        let dat = std::fs::read(path_in)?;
        let packed = wad::compress(&dat,select(method))?;
        std::fs::write(path_out,packed)?;
    }

    if let Some(cmd) = matches.subcommand_matches("decompress") {
        let path_in = cmd.get_one::<String>("input").expect(RCH);
        let path_out = cmd.get_one::<String>("output").expect(RCH);
        let method = cmd.get_one::<String>("method").expect(RCH);
        let dat = std::fs::read(path_in)?;
        let expanded = wad::decompress(&dat,select(method))?;
        std::fs::write(path_out,expanded)?;
    }

    if let Some(cmd) = matches.subcommand_matches("pad") {
        let path_in = cmd.get_one::<String>("input").expect(RCH);
        let path_out = cmd.get_one::<String>("output").expect(RCH);
        let dat = std::fs::read(path_in)?;
        let padded = wad::pad(&dat)?;
        std::fs::write(path_out,padded)?;
    }

    if let Some(cmd) = matches.subcommand_matches("list") {
        let path_in = cmd.get_one::<String>("input").expect(RCH);
        let dat = std::fs::read(path_in)?;
        for row in wad::catalog(&dat)? {
            println!("{}",row);
        }
    }

    Ok(())
}

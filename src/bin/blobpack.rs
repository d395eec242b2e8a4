use env_logger::Env;

use blobpack::cli;
use blobpack::error;

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let argv: Vec<String> = std::env::args().collect();
    let args = match cli::parse_args(&argv) {
        Ok(args) => args,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(error::arg_exit_code());
        }
    };

    if let Err(err) = blobpack::pack::pack(&args.src_path, &args.dst_path, args.page_size) {
        eprintln!("{err:#}");
        std::process::exit(error::runtime_exit_code());
    }
}

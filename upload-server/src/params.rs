use clap::Parser;

#[derive(Parser, Debug)]
#[clap(about = "Stores uploaded files in a local directory and serves them back")]
pub struct Args {
    #[clap(long, env = "UPLOAD_HTTP_ADDR", default_value = "127.0.0.1:8080")]
    pub(crate) http_addr: String,
    #[clap(long, env = "UPLOAD_DIR", default_value = "./uploads")]
    pub(crate) upload_dir: String,
    /// Largest accepted total size of the files in one upload request, in bytes.
    #[clap(long, env = "UPLOAD_MAX_SIZE", default_value_t = 32 * 1024 * 1024)]
    pub(crate) max_upload_size: usize,
}

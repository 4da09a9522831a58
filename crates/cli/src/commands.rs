use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Scan every configured table and print new rows as JSON lines
    Scan {
        #[arg(long, help = "Config file path")]
        config: String,

        #[arg(long, help = "Only scan this table")]
        table: Option<String>,

        #[arg(long, help = "Stop once every table has been drained")]
        once: bool,
    },
    /// Print the token an initial offset resolves to
    Resolve {
        /// Offset type: "long", "decimal", "datetime", …
        #[arg(long = "type")]
        offset_type: String,

        #[arg(long)]
        value: String,
    },
    /// List persisted offsets
    Offsets {
        #[arg(long, help = "Config file path")]
        config: String,

        #[arg(long, help = "Print the offsets as JSON instead of a table")]
        json: bool,
    },
    /// Forget the persisted offset of a table so the next scan starts over
    Reset {
        #[arg(long, help = "Config file path")]
        config: String,

        #[arg(long)]
        table: String,
    },
    /// Connect to a database and run a trivial query
    TestConn {
        /// Connection URL (mysql:// or postgres://)
        #[arg(long)]
        url: String,
    },
}

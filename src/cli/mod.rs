use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Send a single utterance to the agent and print its reply
    Ask {
        text: String,

        /// Continue an existing conversation
        #[arg(short, long)]
        conversation_id: Option<String>,

        #[arg(short = 'L', long, default_value = "en")]
        language: String,

        /// Print the full turn result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Interactive conversation reading utterances from stdin
    Chat {
        #[arg(short = 'L', long, default_value = "en")]
        language: String,
    },

    /// Print the entity block the model is shown
    Entities,

    /// Verify the OpenAI API key
    Check,
}

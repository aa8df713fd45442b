use std::path::Path;

#[derive(Debug, Default, serde::Deserialize)]
pub struct Config {
    #[serde(default)]
    pub cache: crate::repository::cache::Config,
    #[serde(default)]
    pub resolver: crate::repository::resolver::Config,
    #[serde(default)]
    pub dns: crate::dns::config::Config,
}

impl Config {
    pub fn load(path: &Path) -> Self {
        let conf = ::config::Config::builder()
            .add_source(::config::File::from(path).required(false))
            .add_source(::config::Environment::default().separator("_"))
            .build()
            .expect("unable to read configuration");
        conf.try_deserialize()
            .expect("configuration format invalid")
    }
}

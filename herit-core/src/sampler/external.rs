//! Out-of-process sampler.
//!
//! Writes the sampler inputs into a working directory, runs a configured
//! program to completion, and reads back the chain files it leaves behind.
//!
//! Working-directory contract:
//! ```text
//! in:  data.csv        animal,dam,sire,treatment,<response>,n_obs
//!      pedigree.csv    animal,dam,sire   (NA = unknown)
//!      model.json      serialized ModelSpec
//! out: sol.csv         one column per location effect, one row per sample
//!      vcv.csv         one column per variance component (animal, units)
//!      dic.txt         optional, a single number
//! ```
//! The working directory is passed as the final argument and also exported
//! as `HERIT_WORK_DIR`, alongside `HERIT_DATA`, `HERIT_PEDIGREE`,
//! `HERIT_MODEL` and `HERIT_OUTPUT_DIR`.

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Context, Result};
use tracing::{debug, info};

use herit_data::chains::read_chains;
use herit_data::tables::{write_dataset, write_pedigree, IndividualSummary};

use super::Sampler;
use crate::model::{ModelSpec, Posterior};
use crate::pedigree::Pedigree;

pub const DATA_FILE: &str = "data.csv";
pub const PEDIGREE_FILE: &str = "pedigree.csv";
pub const MODEL_FILE: &str = "model.json";
pub const SOL_FILE: &str = "sol.csv";
pub const VCV_FILE: &str = "vcv.csv";
pub const DIC_FILE: &str = "dic.txt";

/// Runs an external program as the sampler.
#[derive(Debug, Clone)]
pub struct ExternalSampler {
    program: PathBuf,
    args: Vec<String>,
    work_dir: PathBuf,
}

impl ExternalSampler {
    pub fn new(program: impl Into<PathBuf>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            work_dir: work_dir.into(),
        }
    }

    /// Arguments placed before the working directory.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Write data, pedigree and model files into the working directory and
    /// remove chain files left by an earlier run.
    pub fn write_inputs(
        &self,
        data: &[IndividualSummary],
        pedigree: &Pedigree,
        spec: &ModelSpec,
    ) -> Result<()> {
        std::fs::create_dir_all(&self.work_dir).with_context(|| {
            format!("Failed to create working directory {}", self.work_dir.display())
        })?;
        self.clear_outputs()?;
        write_dataset(data, &spec.response, &self.work_dir.join(DATA_FILE))?;
        write_pedigree(pedigree.rows(), &self.work_dir.join(PEDIGREE_FILE))?;
        let json = serde_json::to_string_pretty(spec)?;
        std::fs::write(self.work_dir.join(MODEL_FILE), json)?;
        debug!("Sampler inputs written to {}", self.work_dir.display());
        Ok(())
    }

    fn clear_outputs(&self) -> Result<()> {
        for name in [SOL_FILE, VCV_FILE, DIC_FILE] {
            let path = self.work_dir.join(name);
            match std::fs::remove_file(&path) {
                Ok(()) => debug!("Removed stale {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(e)
                        .with_context(|| format!("Failed to remove {}", path.display()))
                }
            }
        }
        Ok(())
    }

    /// Read the chain files left in the working directory.
    pub fn read_outputs(&self, spec: &ModelSpec) -> Result<Posterior> {
        read_posterior_dir(&self.work_dir, spec)
    }

    fn run_program(&self) -> Result<()> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(&self.work_dir)
            .env("HERIT_WORK_DIR", &self.work_dir)
            .env("HERIT_DATA", self.work_dir.join(DATA_FILE))
            .env("HERIT_PEDIGREE", self.work_dir.join(PEDIGREE_FILE))
            .env("HERIT_MODEL", self.work_dir.join(MODEL_FILE))
            .env("HERIT_OUTPUT_DIR", &self.work_dir);

        info!("Launching sampler: {}", self.program.display());
        let output = cmd
            .output()
            .with_context(|| format!("Failed to launch {}", self.program.display()))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        for line in stdout.lines() {
            debug!("sampler: {}", line);
        }
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                stderr.trim()
            );
        }
        Ok(())
    }
}

impl Sampler for ExternalSampler {
    fn name(&self) -> &str {
        "external"
    }

    fn sample(
        &self,
        data: &[IndividualSummary],
        pedigree: &Pedigree,
        spec: &ModelSpec,
    ) -> Result<Posterior> {
        self.write_inputs(data, pedigree, spec)?;
        self.run_program()?;
        self.read_outputs(spec)
    }
}

/// Assemble a posterior from `sol.csv`, `vcv.csv` and optional `dic.txt`
/// in `dir`.
pub fn read_posterior_dir(dir: &Path, spec: &ModelSpec) -> Result<Posterior> {
    let sol = read_chains(&dir.join(SOL_FILE))?;
    let vcv = read_chains(&dir.join(VCV_FILE))?;
    let dic_path = dir.join(DIC_FILE);
    let dic = if dic_path.exists() {
        Some(read_dic(&dic_path)?)
    } else {
        None
    };
    Posterior::new(spec.clone(), sol, vcv, dic)
}

fn read_dic(path: &Path) -> Result<f64> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    text.trim()
        .parse()
        .with_context(|| format!("Invalid DIC value in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use herit_data::tables::PedigreeRow;

    fn inputs() -> (Vec<IndividualSummary>, Pedigree) {
        let data = vec![IndividualSummary {
            animal: 1000,
            dam: 9000,
            sire: None,
            treatment: "c".into(),
            trait_mean: 0.9,
            n_obs: 3,
        }];
        let ped = Pedigree::from_rows(vec![
            PedigreeRow::founder(9000),
            PedigreeRow {
                animal: 1000,
                dam: Some(9000),
                sire: None,
            },
        ]);
        (data, ped)
    }

    #[test]
    fn test_write_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let sampler = ExternalSampler::new("unused", dir.path().join("work"));
        let (data, ped) = inputs();
        sampler
            .write_inputs(&data, &ped, &ModelSpec::default())
            .unwrap();

        let work = sampler.work_dir();
        let ped_text = std::fs::read_to_string(work.join(PEDIGREE_FILE)).unwrap();
        assert_eq!(ped_text, "animal,dam,sire\n9000,NA,NA\n1000,9000,NA\n");
        let spec: ModelSpec =
            serde_json::from_str(&std::fs::read_to_string(work.join(MODEL_FILE)).unwrap())
                .unwrap();
        assert_eq!(spec, ModelSpec::default());
        assert!(work.join(DATA_FILE).exists());
    }

    #[test]
    fn test_read_posterior_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(SOL_FILE), "(Intercept)\n0.8\n0.9\n").unwrap();
        std::fs::write(dir.path().join(VCV_FILE), "animal,units\n0.1,0.2\n0.2,0.1\n").unwrap();
        std::fs::write(dir.path().join(DIC_FILE), " -12.5\n").unwrap();

        let post = read_posterior_dir(dir.path(), &ModelSpec::default()).unwrap();
        assert_eq!(post.n_samples(), 2);
        assert_eq!(post.dic, Some(-12.5));
        assert_eq!(post.residual().unwrap(), &[0.2, 0.1]);
    }

    #[test]
    fn test_missing_program_fails() {
        let dir = tempfile::tempdir().unwrap();
        let sampler = ExternalSampler::new(dir.path().join("no-such-sampler"), dir.path());
        let (data, ped) = inputs();
        assert!(sampler.sample(&data, &ped, &ModelSpec::default()).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_shell_sampler() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("sampler.sh");
        std::fs::write(
            &script,
            "#!/bin/sh\n\
             set -e\n\
             test -f \"$HERIT_PEDIGREE\"\n\
             printf '(Intercept)\\n1.0\\n1.1\\n' > \"$1/sol.csv\"\n\
             printf 'animal,units\\n0.3,0.7\\n0.4,0.6\\n' > \"$1/vcv.csv\"\n",
        )
        .unwrap();

        let sampler = ExternalSampler::new("/bin/sh", dir.path().join("work")).with_args([script
            .to_string_lossy()
            .into_owned()]);
        let (data, ped) = inputs();
        let post = sampler.sample(&data, &ped, &ModelSpec::default()).unwrap();
        assert_eq!(post.additive().unwrap(), &[0.3, 0.4]);
        assert_eq!(post.dic, None);
    }

    #[cfg(unix)]
    fn shell_sampler(dir: &Path, name: &str, body: &str) -> ExternalSampler {
        let script = dir.join(name);
        std::fs::write(&script, format!("#!/bin/sh\n{}", body)).unwrap();
        ExternalSampler::new("/bin/sh", dir.join("work"))
            .with_args([script.to_string_lossy().into_owned()])
    }

    #[cfg(unix)]
    #[test]
    fn test_rerun_does_not_reuse_old_chains() {
        let dir = tempfile::tempdir().unwrap();
        let (data, ped) = inputs();
        let first = shell_sampler(
            dir.path(),
            "full.sh",
            "printf '(Intercept)\\n1.0\\n' > \"$1/sol.csv\"\n\
             printf 'animal,units\\n0.3,0.7\\n' > \"$1/vcv.csv\"\n\
             echo 10.5 > \"$1/dic.txt\"\n",
        );
        let post = first.sample(&data, &ped, &ModelSpec::default()).unwrap();
        assert_eq!(post.dic, Some(10.5));

        // Exits cleanly without writing anything.
        let silent = shell_sampler(dir.path(), "noop.sh", "exit 0\n");
        let err = silent
            .sample(&data, &ped, &ModelSpec::default())
            .unwrap_err();
        assert!(format!("{:#}", err).contains(SOL_FILE), "{:#}", err);
        assert!(!silent.work_dir().join(VCV_FILE).exists());
        assert!(!silent.work_dir().join(DIC_FILE).exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_rerun_without_dic_drops_old_dic() {
        let dir = tempfile::tempdir().unwrap();
        let (data, ped) = inputs();
        let chains = "printf '(Intercept)\\n1.0\\n' > \"$1/sol.csv\"\n\
                      printf 'animal,units\\n0.3,0.7\\n' > \"$1/vcv.csv\"\n";
        let with_dic = shell_sampler(
            dir.path(),
            "dic.sh",
            &format!("{}echo 3.0 > \"$1/dic.txt\"\n", chains),
        );
        assert_eq!(
            with_dic.sample(&data, &ped, &ModelSpec::default()).unwrap().dic,
            Some(3.0)
        );

        let without_dic = shell_sampler(dir.path(), "nodic.sh", chains);
        let post = without_dic
            .sample(&data, &ped, &ModelSpec::default())
            .unwrap();
        assert_eq!(post.dic, None);
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_sampler_reports_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fail.sh");
        std::fs::write(&script, "#!/bin/sh\necho 'pedigree malformed' >&2\nexit 3\n").unwrap();

        let sampler = ExternalSampler::new("/bin/sh", dir.path().join("work"))
            .with_args([script.to_string_lossy().into_owned()]);
        let (data, ped) = inputs();
        let err = sampler
            .sample(&data, &ped, &ModelSpec::default())
            .unwrap_err();
        assert!(err.to_string().contains("pedigree malformed"));
    }
}

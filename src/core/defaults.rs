//! Built-in sample pipeline written by `pipewright init`.

/// The seismology-package pipeline the runner was extracted from: MPI system
/// package, Miniconda bootstrap, a conda env pinned to the matrix runtime,
/// coverage-instrumented tests, and docs tooling/build/publish gated to a
/// single runtime.
pub fn sample_pipeline() -> &'static str {
    r#"# One job per runtime; steps with `only` run for those runtimes alone.
name: pyasdf
runtimes: ["2.7", "3.4"]
shm_workaround: true

env:
  global:
    - secret: coveralls-token
      var: COVERALLS_REPO_TOKEN

before_install:
  - sudo apt-get update -qq
  - sudo apt-get install -qq mpich2 libmpich2-dev
  - wget http://repo.continuum.io/miniconda/Miniconda-latest-Linux-x86_64.sh -O miniconda.sh
  - chmod +x miniconda.sh
  - ./miniconda.sh -b

install:
  - conda create -n condaenv --yes pip python=$TRAVIS_PYTHON_VERSION
  - conda install -n condaenv --yes pip python=$TRAVIS_PYTHON_VERSION pytest flake8 colorama h5py obspy nose mpi4py
  - pip install coveralls
  - name: docs tooling
    run: pip install sphinx sphinx_rtd_theme
    only: ["2.7"]
  - pip install -e .

script:
  - coverage run --source=pyasdf -m pyasdf.tests
  - name: build docs
    run: cd doc && make html
    only: ["2.7"]

after_success:
  - coveralls
  - name: publish docs
    run: bash .travis-update-gh-pages.sh
    only: ["2.7"]
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config;

    #[test]
    fn sample_pipeline_parses_and_validates() {
        let parsed = config::parse(sample_pipeline(), "sample").unwrap();
        assert_eq!(parsed.runtimes.len(), 2);
        assert!(parsed.shm_workaround);
        assert_eq!(parsed.secret_refs().len(), 1);
        assert_eq!(parsed.before_install.len(), 5);
        assert_eq!(parsed.install.len(), 5);
        assert_eq!(parsed.script.len(), 2);
        assert_eq!(parsed.after_success.len(), 2);
    }
}

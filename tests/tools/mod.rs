mod test_python;

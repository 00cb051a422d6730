mod ash;
